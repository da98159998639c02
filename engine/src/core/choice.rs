//! Choices made during deliberation and their simulated effect.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::belief::BeliefBase;
use crate::core::intention::Intention;
use crate::error::EngineError;

/// One decision: commit a plan for an intention's current goal, or execute its
/// current action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Choice {
    SelectPlan { intention: usize, plan: usize },
    ExecuteAction { intention: usize },
}

impl Choice {
    pub fn intention(&self) -> usize {
        match self {
            Choice::SelectPlan { intention, .. } | Choice::ExecuteAction { intention } => {
                *intention
            }
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Choice::ExecuteAction { .. })
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::SelectPlan { intention, plan } => write!(f, "plan({}:{})", intention, plan),
            Choice::ExecuteAction { intention } => write!(f, "act({})", intention),
        }
    }
}

/// Apply `choice` to simulated state: plan commits push the goal, action
/// commits write postconditions into `beliefs` and advance the cursor.
///
/// No environment check happens here. A choice that does not fit the
/// intention's current step is an invariant violation.
pub fn apply_choice(
    intentions: &mut [Intention],
    beliefs: &mut BeliefBase,
    choice: &Choice,
) -> Result<(), EngineError> {
    let index = choice.intention();
    let count = intentions.len();
    let Some(intention) = intentions.get_mut(index) else {
        return Err(EngineError::violation(
            "<none>",
            format!("intention index out of range ({} intentions)", count),
        )
        .in_intention(index, Some(*choice)));
    };
    let result = match choice {
        Choice::SelectPlan { plan, .. } => intention.simulate_plan(*plan),
        Choice::ExecuteAction { .. } => intention.simulate_action(beliefs),
    };
    result.map_err(|err| err.in_intention(index, Some(*choice)))
}

/// Number of intentions with no current step (achieved or exhausted).
pub fn finished_count(intentions: &[Intention]) -> usize {
    intentions.iter().filter(|i| i.is_finished()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{action, goal, intention, lit, plan};

    #[test]
    fn applies_plan_then_action() {
        let mut intentions = vec![intention(goal(
            "g",
            vec![
                plan("p0", &["no+"], vec![action("a0", &[], &["x+"])]),
                plan("p1", &[], vec![action("a1", &[], &["y+"])]),
            ],
        ))];
        let mut beliefs = BeliefBase::new();
        apply_choice(&mut intentions, &mut beliefs, &Choice::SelectPlan { intention: 0, plan: 1 })
            .expect("plan");
        apply_choice(&mut intentions, &mut beliefs, &Choice::ExecuteAction { intention: 0 })
            .expect("action");
        assert!(beliefs.holds(&[lit("y+")]));
        assert_eq!(beliefs.probability("x"), None);
        assert_eq!(finished_count(&intentions), 1);
    }

    /// Structural mismatches surface as invariant violations with context.
    #[test]
    fn mismatched_choice_is_violation() {
        let mut intentions = vec![intention(goal(
            "g",
            vec![plan("p", &[], vec![action("a", &[], &[])])],
        ))];
        let mut beliefs = BeliefBase::new();
        let act = Choice::ExecuteAction { intention: 0 };
        let err = apply_choice(&mut intentions, &mut beliefs, &act)
            .expect_err("goal is not an action");
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("act(0)"));

        let missing = Choice::SelectPlan {
            intention: 4,
            plan: 0,
        };
        let err = apply_choice(&mut intentions, &mut beliefs, &missing)
            .expect_err("no such intention");
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(Choice::SelectPlan { intention: 2, plan: 0 }.to_string(), "plan(2:0)");
        assert_eq!(Choice::ExecuteAction { intention: 1 }.to_string(), "act(1)");
    }
}
