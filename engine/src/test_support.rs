//! Test-only builders for literals, goal-plan trees, scenarios and environments.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use rand::Rng;
use tempfile::TempDir;

use crate::core::belief::BeliefBase;
use crate::core::intention::Intention;
use crate::core::literal::Literal;
use crate::core::tree::{ActionNode, GoalTree};
use crate::core::types::{ActionDef, GoalDef, LiteralDecl, PlanDef, Scenario, StepDef};
use crate::io::environment::{Environment, Vision};

/// Parse `"name+"` / `"name-"`; panics on malformed input.
pub fn lit(text: &str) -> Literal {
    text.parse().expect("test literal")
}

pub fn lits(texts: &[&str]) -> Vec<Literal> {
    texts.iter().map(|t| lit(t)).collect()
}

pub fn action(name: &str, pre: &[&str], post: &[&str]) -> StepDef {
    StepDef::Action(ActionDef {
        name: name.to_string(),
        pre: lits(pre),
        post: lits(post),
    })
}

pub fn plan(name: &str, context: &[&str], body: Vec<StepDef>) -> PlanDef {
    PlanDef {
        name: name.to_string(),
        context: lits(context),
        body,
    }
}

pub fn goal(name: &str, plans: Vec<PlanDef>) -> GoalDef {
    GoalDef {
        name: name.to_string(),
        condition: Vec::new(),
        plans,
    }
}

pub fn subgoal(goal: GoalDef) -> StepDef {
    StepDef::Goal(goal)
}

pub fn tree(def: GoalDef) -> Arc<GoalTree> {
    Arc::new(GoalTree::from_def(&def))
}

pub fn intention(def: GoalDef) -> Intention {
    Intention::new(tree(def))
}

/// Certain beliefs from literal strings.
pub fn beliefs(texts: &[&str]) -> BeliefBase {
    BeliefBase::from_literals(&lits(texts))
}

pub fn decl(name: &str, value: bool) -> LiteralDecl {
    LiteralDecl {
        name: name.to_string(),
        value,
        probability: None,
        vision: None,
    }
}

pub fn scenario(literals: Vec<LiteralDecl>, goals: Vec<GoalDef>) -> Scenario {
    Scenario {
        name: None,
        literals,
        goals,
    }
}

/// One intention, one plan, two actions chained through `p`.
pub fn two_action_scenario() -> Scenario {
    scenario(
        vec![decl("p", false), decl("q", false)],
        vec![goal(
            "g0",
            vec![plan(
                "p0",
                &[],
                vec![action("a1", &[], &["p+"]), action("a2", &["p+"], &["q+"])],
            )],
        )],
    )
}

/// Scenario JSON written into a temporary directory that lives as long as this value.
pub struct ScenarioFile {
    dir: TempDir,
    pub path: PathBuf,
}

impl ScenarioFile {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let path = dir.path().join("scenario.json");
        let mut buf = serde_json::to_string_pretty(scenario).context("serialize scenario")?;
        buf.push('\n');
        std::fs::write(&path, buf).with_context(|| format!("write {}", path.display()))?;
        Ok(Self { dir, path })
    }

    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Environment that replays queued action results and percept batches.
#[derive(Debug, Default)]
pub struct ScriptedEnvironment {
    results: VecDeque<bool>,
    percepts: VecDeque<Vec<Literal>>,
    pub applied: Vec<ActionNode>,
}

impl ScriptedEnvironment {
    pub fn new(results: Vec<bool>) -> Self {
        Self {
            results: results.into(),
            percepts: VecDeque::new(),
            applied: Vec::new(),
        }
    }

    pub fn with_percepts(mut self, batches: Vec<Vec<Literal>>) -> Self {
        self.percepts = batches.into();
        self
    }

    /// Error if any scripted result was not consumed.
    pub fn assert_drained(&self) -> Result<()> {
        if self.results.is_empty() {
            return Ok(());
        }
        Err(anyhow!(
            "{} scripted action results left unused",
            self.results.len()
        ))
    }
}

impl Environment for ScriptedEnvironment {
    fn apply(&mut self, action: &ActionNode) -> bool {
        self.applied.push(action.clone());
        self.results.pop_front().expect("scripted action result")
    }

    fn current_percepts<R: Rng>(&mut self, _vision: &Vision, _rng: &mut R) -> Vec<Literal> {
        self.percepts.pop_front().unwrap_or_default()
    }
}
