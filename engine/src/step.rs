//! Orchestration for a single sense/deliberate/execute cycle.

use std::sync::Arc;

use rand::Rng;
use tracing::info;

use crate::agent::Agent;
use crate::core::choice::Choice;
use crate::core::tree::GoalTree;
use crate::error::EngineError;
use crate::io::environment::Environment;

/// Result of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was executable; the agent did not act.
    Idle,
    Executed {
        /// Index of the intention that acted.
        intention: usize,
        /// Name of the executed action.
        action: String,
        /// Choices committed this cycle, ending with the action.
        choices: Vec<Choice>,
        /// Whether the environment accepted the action.
        succeeded: bool,
    },
}

/// Run one cycle: sense, adopt `new_goals`, deliberate, execute, then report
/// the environment's verdict back to the agent.
pub fn run_cycle<E: Environment, R: Rng>(
    agent: &mut Agent,
    env: &mut E,
    new_goals: Vec<Arc<GoalTree>>,
    rng: &mut R,
) -> Result<CycleOutcome, EngineError> {
    agent.sense(env, rng);
    agent.adopt_goals(new_goals);

    let Some(choices) = agent.deliberate(rng)? else {
        return Ok(CycleOutcome::Idle);
    };
    let Some(action) = agent.execute()? else {
        return Err(EngineError::violation(
            "<none>",
            format!("deliberation produced no action ({} choices)", choices.len()),
        ));
    };
    let (Some(node), Some(name)) = (agent.action(&action).cloned(), agent.action_name(&action))
    else {
        return Err(EngineError::violation("<none>", "executed step is not an action")
            .in_intention(action.intention, None));
    };
    let name = name.to_string();

    let succeeded = env.apply(&node);
    info!(
        agent = agent.name(),
        intention = action.intention,
        action = %name,
        succeeded,
        "cycle"
    );
    if succeeded {
        agent.report_success(action)?;
    } else {
        agent.report_failure(action)?;
    }
    Ok(CycleOutcome::Executed {
        intention: action.intention,
        action: name,
        choices,
        succeeded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::intention::IntentionStatus;
    use crate::io::environment::Vision;
    use crate::io::scenario::{build_trees, initial_beliefs};
    use crate::search::SearchConfig;
    use crate::test_support::{ScriptedEnvironment, two_action_scenario};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fresh_agent() -> (Agent, Vec<Arc<GoalTree>>) {
        let scenario = two_action_scenario();
        let agent = Agent::new(
            "a",
            initial_beliefs(&scenario).expect("beliefs"),
            Vision::new(),
            SearchConfig::default(),
        );
        (agent, build_trees(&scenario))
    }

    #[test]
    fn cycle_executes_and_reports_success() {
        let (mut agent, goals) = fresh_agent();
        let mut env = ScriptedEnvironment::new(vec![true, true]);
        let mut rng = StdRng::seed_from_u64(3);

        let first = run_cycle(&mut agent, &mut env, goals, &mut rng).expect("cycle");
        assert!(matches!(
            &first,
            CycleOutcome::Executed { action, succeeded: true, .. } if action == "a1"
        ));
        let second = run_cycle(&mut agent, &mut env, Vec::new(), &mut rng).expect("cycle");
        assert!(matches!(
            &second,
            CycleOutcome::Executed { action, choices, .. } if action == "a2" && choices.len() == 1
        ));
        assert_eq!(agent.intentions()[0].status(), IntentionStatus::Achieved);
        assert_eq!(
            run_cycle(&mut agent, &mut env, Vec::new(), &mut rng).expect("cycle"),
            CycleOutcome::Idle
        );
        env.assert_drained().expect("drained");
        assert_eq!(env.applied.len(), 2);
    }

    /// A rejected action backtracks; with a single plan the goal fails.
    #[test]
    fn rejected_action_fails_the_goal() {
        let (mut agent, goals) = fresh_agent();
        let mut env = ScriptedEnvironment::new(vec![false]);
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = run_cycle(&mut agent, &mut env, goals, &mut rng).expect("cycle");
        assert!(matches!(outcome, CycleOutcome::Executed { succeeded: false, .. }));
        assert_eq!(agent.failed(), vec!["g0".to_string()]);
        assert_eq!(
            run_cycle(&mut agent, &mut env, Vec::new(), &mut rng).expect("cycle"),
            CycleOutcome::Idle
        );
    }
}
