//! Library error type.
//!
//! `InvariantViolation` is the fatal class: a choice or transition that does
//! not fit the intention it was applied to. Callers must not continue a search
//! or episode after seeing one.

use std::fmt;

use thiserror::Error;

use crate::core::choice::Choice;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    InvariantViolation(Violation),

    #[error("invalid literal '{text}': {reason}")]
    InvalidLiteral { text: String, reason: String },

    #[error("probability {value} for '{name}' is outside [0,1]")]
    InvalidProbability { name: String, value: f64 },

    #[error("invalid scenario: {}", .0.join("; "))]
    InvalidScenario(Vec<String>),
}

/// Where a structural inconsistency happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub intention: Option<usize>,
    /// Slash-separated path of the node the intention was on.
    pub node: String,
    pub choice: Option<Choice>,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.reason, self.node)?;
        if let Some(intention) = self.intention {
            write!(f, " (intention {})", intention)?;
        }
        if let Some(choice) = &self.choice {
            write!(f, " while applying {}", choice)?;
        }
        Ok(())
    }
}

impl EngineError {
    pub fn violation(node: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvariantViolation(Violation {
            intention: None,
            node: node.into(),
            choice: None,
            reason: reason.into(),
        })
    }

    /// Attach intention/choice context to a violation. Other variants pass through.
    pub fn in_intention(self, intention: usize, choice: Option<Choice>) -> Self {
        match self {
            EngineError::InvariantViolation(mut v) => {
                v.intention = Some(intention);
                if v.choice.is_none() {
                    v.choice = choice;
                }
                EngineError::InvariantViolation(v)
            }
            other => other,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_carries_full_context() {
        let err = EngineError::violation("g0/p1/a2", "plan index 3 out of range")
            .in_intention(1, Some(Choice::SelectPlan { intention: 1, plan: 3 }));
        let text = err.to_string();
        assert!(text.contains("plan index 3 out of range"));
        assert!(text.contains("g0/p1/a2"));
        assert!(text.contains("intention 1"));
        assert!(text.contains("plan(1:3)"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn in_intention_leaves_other_errors_alone() {
        let err = EngineError::InvalidScenario(vec!["a".into(), "b".into()]).in_intention(0, None);
        assert_eq!(err.to_string(), "invalid scenario: a; b");
        assert!(!err.is_invariant_violation());
    }
}
