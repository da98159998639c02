//! Episode loop: cycles until the agent goes idle or the cycle cap is hit.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::agent::Agent;
use crate::core::tree::GoalTree;
use crate::core::types::Scenario;
use crate::error::EngineError;
use crate::io::config::EngineConfig;
use crate::io::environment::Environment;
use crate::io::scenario::{build_trees, initial_beliefs, vision, world};
use crate::step::{CycleOutcome, run_cycle};

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoopStop {
    /// Nothing was executable: every intention is finished or blocked.
    Idle,
    /// Intentions were still active after `max_cycles` cycles.
    MaxCyclesExceeded { max_cycles: u32 },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Cycles in which an action was executed.
    pub cycles: u32,
    pub stop: LoopStop,
}

/// Summary of a whole scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub seed: u64,
    pub cycles: u32,
    /// Achieved top-level goals in the order they were achieved.
    pub achieved: Vec<String>,
    /// Top-level goals whose intention failed.
    pub failed: Vec<String>,
    pub stop: LoopStop,
}

/// Run cycles until the agent has nothing executable or `max_cycles` is reached.
///
/// `goals` are adopted in the first cycle. Stops immediately on an invariant
/// violation.
pub fn run_loop<E, R, F>(
    agent: &mut Agent,
    env: &mut E,
    goals: Vec<Arc<GoalTree>>,
    max_cycles: u32,
    rng: &mut R,
    mut on_cycle: F,
) -> Result<LoopOutcome, EngineError>
where
    E: Environment,
    R: Rng,
    F: FnMut(u32, &CycleOutcome),
{
    let mut goals = Some(goals);
    let mut cycles = 0u32;
    loop {
        if cycles >= max_cycles {
            let stop = if agent.has_active_intentions() {
                LoopStop::MaxCyclesExceeded { max_cycles }
            } else {
                LoopStop::Idle
            };
            return Ok(LoopOutcome { cycles, stop });
        }
        let outcome = run_cycle(agent, env, goals.take().unwrap_or_default(), rng)?;
        if outcome == CycleOutcome::Idle {
            return Ok(LoopOutcome {
                cycles,
                stop: LoopStop::Idle,
            });
        }
        cycles += 1;
        on_cycle(cycles, &outcome);
    }
}

/// Run `scenario` from scratch against its synthetic world.
///
/// Without a configured seed one is drawn from entropy and logged, so any run
/// can be replayed.
#[instrument(
    skip_all,
    fields(
        scenario = scenario.name.as_deref().unwrap_or("<unnamed>"),
        policy = %cfg.search.policy
    )
)]
pub fn run_scenario<F>(
    scenario: &Scenario,
    cfg: &EngineConfig,
    on_cycle: F,
) -> Result<EpisodeOutcome>
where
    F: FnMut(u32, &CycleOutcome),
{
    cfg.validate()?;
    let seed = match cfg.run.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random();
            info!(seed, "drew episode seed");
            seed
        }
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let beliefs = initial_beliefs(scenario).context("initial beliefs")?;
    let mut env = world(scenario).context("build world")?;
    let mut agent = Agent::new(
        scenario.name.clone().unwrap_or_else(|| "agent".to_string()),
        beliefs,
        vision(scenario),
        cfg.search.clone(),
    )
    .with_profile_samples(cfg.run.profile_samples);

    let outcome = run_loop(
        &mut agent,
        &mut env,
        build_trees(scenario),
        cfg.run.max_cycles,
        &mut rng,
        on_cycle,
    )
    .context("run episode")?;

    let episode = EpisodeOutcome {
        seed,
        cycles: outcome.cycles,
        achieved: agent.achieved().to_vec(),
        failed: agent.failed(),
        stop: outcome.stop,
    };
    info!(
        seed,
        cycles = episode.cycles,
        achieved = episode.achieved.len(),
        failed = episode.failed.len(),
        "episode finished"
    );
    Ok(episode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::environment::Vision;
    use crate::search::{SearchConfig, SearchPolicy};
    use crate::test_support::{
        ScriptedEnvironment, action, beliefs, decl, goal, plan, scenario, tree,
        two_action_scenario,
    };

    fn seeded(policy: SearchPolicy) -> EngineConfig {
        let mut cfg = EngineConfig::default();
        cfg.search.policy = policy;
        cfg.search.iterations = 40;
        cfg.run.seed = Some(17);
        cfg.run.profile_samples = 50;
        cfg
    }

    #[test]
    fn episode_achieves_two_action_goal() {
        for policy in [SearchPolicy::Uct, SearchPolicy::SpMcts, SearchPolicy::QsiMcts] {
            let mut seen = Vec::new();
            let outcome = run_scenario(&two_action_scenario(), &seeded(policy), |cycle, _| {
                seen.push(cycle);
            })
            .expect("episode");
            assert_eq!(outcome.achieved, vec!["g0".to_string()], "{policy}");
            assert_eq!(outcome.cycles, 2);
            assert_eq!(outcome.stop, LoopStop::Idle);
            assert_eq!(outcome.seed, 17);
            assert_eq!(seen, vec![1, 2]);
        }
    }

    /// Interleaving matters: running the guarded goal first achieves both.
    #[test]
    fn conflicting_goals_are_ordered() {
        let contested = scenario(
            vec![decl("k", true), decl("done", false)],
            vec![
                goal(
                    "spend",
                    vec![plan("p0", &[], vec![action("use_key", &[], &["k-"])])],
                ),
                goal(
                    "open",
                    vec![plan("p1", &[], vec![action("unlock", &["k+"], &["done+"])])],
                ),
            ],
        );
        for policy in [SearchPolicy::SpMcts, SearchPolicy::QsiMcts] {
            let outcome = run_scenario(&contested, &seeded(policy), |_, _| {}).expect("episode");
            assert_eq!(outcome.achieved.len(), 2, "{policy}: {outcome:?}");
            assert_eq!(outcome.achieved[0], "open");
        }
    }

    #[test]
    fn same_seed_same_episode() {
        let cfg = seeded(SearchPolicy::SpMcts);
        let a = run_scenario(&two_action_scenario(), &cfg, |_, _| {}).expect("episode");
        let b = run_scenario(&two_action_scenario(), &cfg, |_, _| {}).expect("episode");
        assert_eq!(a, b);
    }

    #[test]
    fn loop_stops_at_max_cycles() {
        let mut agent = Agent::new("a", beliefs(&[]), Vision::new(), SearchConfig::default());
        let mut env = ScriptedEnvironment::new(vec![true]);
        let mut rng = StdRng::seed_from_u64(0);
        let goals = vec![tree(goal(
            "g",
            vec![plan("p", &[], vec![action("a", &[], &[]), action("b", &[], &[])])],
        ))];
        let outcome = run_loop(&mut agent, &mut env, goals, 1, &mut rng, |_, _| {}).expect("loop");
        assert_eq!(outcome.cycles, 1);
        assert_eq!(outcome.stop, LoopStop::MaxCyclesExceeded { max_cycles: 1 });
    }
}
