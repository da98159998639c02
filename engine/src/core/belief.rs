//! Probabilistic belief store.
//!
//! Maps literal names to the probability that the fact is true. Conjunctions
//! are evaluated under an independence assumption. Updates overwrite, they are
//! not Bayesian.

use std::collections::HashMap;

use crate::core::literal::Literal;
use crate::error::EngineError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeliefBase {
    probs: HashMap<String, f64>,
}

impl BeliefBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Certain beliefs built from a set of literals.
    pub fn from_literals<'a>(literals: impl IntoIterator<Item = &'a Literal>) -> Self {
        let mut beliefs = Self::new();
        beliefs.update_all(literals);
        beliefs
    }

    pub fn set_probability(&mut self, name: &str, prob: f64) -> Result<(), EngineError> {
        if !prob.is_finite() || !(0.0..=1.0).contains(&prob) {
            return Err(EngineError::InvalidProbability {
                name: name.to_string(),
                value: prob,
            });
        }
        self.probs.insert(name.to_string(), prob);
        Ok(())
    }

    /// Stored probability that `name` is true, if the name is known.
    pub fn probability(&self, name: &str) -> Option<f64> {
        self.probs.get(name).copied()
    }

    /// Probability that `literal` holds. Unknown names count as false.
    pub fn evaluate(&self, literal: &Literal) -> f64 {
        let prob = self.probability(literal.name()).unwrap_or(0.0);
        if literal.value() { prob } else { 1.0 - prob }
    }

    /// Product of the individual probabilities; 1.0 for an empty set.
    pub fn evaluate_all(&self, literals: &[Literal]) -> f64 {
        literals.iter().map(|l| self.evaluate(l)).product()
    }

    /// True when every literal holds with certainty.
    pub fn holds(&self, literals: &[Literal]) -> bool {
        self.evaluate_all(literals) == 1.0
    }

    pub fn update(&mut self, literal: &Literal) {
        let prob = if literal.value() { 1.0 } else { 0.0 };
        self.probs.insert(literal.name().to_string(), prob);
    }

    pub fn update_all<'a>(&mut self, literals: impl IntoIterator<Item = &'a Literal>) {
        for literal in literals {
            self.update(literal);
        }
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Entries sorted by name.
    pub fn entries(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<_> = self.probs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
