//! Scenario load/save with schema + invariant validation, and the runtime
//! pieces built from a scenario.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::belief::BeliefBase;
use crate::core::invariants::validate_invariants;
use crate::core::literal::Literal;
use crate::core::tree::GoalTree;
use crate::core::types::Scenario;
use crate::error::EngineError;
use crate::io::environment::{SyntheticEnvironment, Vision};

pub const SCENARIO_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/scenario/v1.schema.json"
));

/// Load and validate a scenario from disk (schema + invariants).
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read scenario {}", path.display()))?;
    parse_scenario(&contents).with_context(|| format!("load scenario {}", path.display()))
}

/// Parse and validate scenario JSON.
pub fn parse_scenario(contents: &str) -> Result<Scenario> {
    let value: Value = serde_json::from_str(contents).context("parse scenario json")?;
    validate_schema(&value)?;
    let scenario: Scenario = serde_json::from_value(value).context("deserialize scenario")?;
    validate_scenario_invariants(&scenario)?;
    Ok(scenario)
}

fn validate_schema(scenario: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SCENARIO_SCHEMA).context("parse embedded schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(scenario) {
        let messages = compiled
            .iter_errors(scenario)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "scenario schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn validate_scenario_invariants(scenario: &Scenario) -> Result<()> {
    let errors = validate_invariants(scenario);
    if errors.is_empty() {
        return Ok(());
    }
    Err(EngineError::InvalidScenario(errors).into())
}

/// The agent's starting beliefs: each declared literal's probability, or
/// certainty about its declared value.
pub fn initial_beliefs(scenario: &Scenario) -> Result<BeliefBase, EngineError> {
    let mut beliefs = BeliefBase::new();
    for decl in &scenario.literals {
        let prob = decl
            .probability
            .unwrap_or(if decl.value { 1.0 } else { 0.0 });
        beliefs.set_probability(&decl.name, prob)?;
    }
    Ok(beliefs)
}

pub fn vision(scenario: &Scenario) -> Vision {
    let mut vision = Vision::new();
    for decl in &scenario.literals {
        if let Some(weight) = decl.vision {
            vision.set(decl.name.clone(), weight);
        }
    }
    vision
}

/// Synthetic world holding each declared literal at its declared value.
pub fn world(scenario: &Scenario) -> Result<SyntheticEnvironment, EngineError> {
    let facts = scenario
        .literals
        .iter()
        .map(|decl| Literal::new(decl.name.clone(), decl.value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SyntheticEnvironment::new(&facts))
}

/// One goal-plan tree per top-level goal, in scenario order.
pub fn build_trees(scenario: &Scenario) -> Vec<Arc<GoalTree>> {
    scenario
        .goals
        .iter()
        .map(|goal| Arc::new(GoalTree::from_def(goal)))
        .collect()
}
