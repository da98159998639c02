//! Environment interface consumed by the agent loop, plus a synthetic world.

use std::collections::HashMap;

use rand::Rng;
use tracing::debug;

use crate::core::literal::Literal;
use crate::core::tree::ActionNode;

/// Per-literal chance that a change is perceived. Unlisted names are fully visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vision {
    weights: HashMap<String, f64>,
}

impl Vision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.set(name, weight);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, weight: f64) {
        self.weights.insert(name.into(), weight.clamp(0.0, 1.0));
    }

    pub fn weight(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(1.0)
    }
}

pub trait Environment {
    /// Execute `action` against the world. `false` when its precondition does not hold.
    fn apply(&mut self, action: &ActionNode) -> bool;

    /// Changes since the last call that the agent happens to see.
    fn current_percepts<R: Rng>(&mut self, vision: &Vision, rng: &mut R) -> Vec<Literal>;
}

/// Boolean world state with no exogenous dynamics of its own.
///
/// Actions succeed exactly when their precondition holds in the world. Changes
/// made by actions or injected with [`SyntheticEnvironment::set`] are reported
/// once through percepts, each filtered by the agent's vision weight.
#[derive(Debug, Clone, Default)]
pub struct SyntheticEnvironment {
    state: HashMap<String, bool>,
    changed: Vec<Literal>,
}

impl SyntheticEnvironment {
    pub fn new<'a>(facts: impl IntoIterator<Item = &'a Literal>) -> Self {
        let state = facts
            .into_iter()
            .map(|l| (l.name().to_string(), l.value()))
            .collect();
        Self {
            state,
            changed: Vec::new(),
        }
    }

    pub fn holds(&self, literal: &Literal) -> bool {
        self.state.get(literal.name()).copied().unwrap_or(false) == literal.value()
    }

    /// Change the world from outside the agent.
    pub fn set(&mut self, literal: &Literal) {
        self.state
            .insert(literal.name().to_string(), literal.value());
        self.changed.push(literal.clone());
    }
}

impl Environment for SyntheticEnvironment {
    fn apply(&mut self, action: &ActionNode) -> bool {
        if !action.pre.iter().all(|l| self.holds(l)) {
            return false;
        }
        for literal in &action.post {
            self.set(literal);
        }
        true
    }

    fn current_percepts<R: Rng>(&mut self, vision: &Vision, rng: &mut R) -> Vec<Literal> {
        let changed = std::mem::take(&mut self.changed);
        let total = changed.len();
        let seen: Vec<Literal> = changed
            .into_iter()
            .filter(|l| rng.r#gen::<f64>() < vision.weight(l.name()))
            .collect();
        debug!(changed = total, seen = seen.len(), "percepts");
        seen
    }
}
