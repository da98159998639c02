//! Per-cycle agent facade: beliefs, intentions and the deliberation state
//! carried between cycles.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::core::belief::BeliefBase;
use crate::core::choice::Choice;
use crate::core::intention::{Intention, IntentionStatus};
use crate::core::tree::{ActionNode, GoalTree, NodeId, NodeKind};
use crate::error::EngineError;
use crate::io::config::RunConfig;
use crate::io::environment::{Environment, Vision};
use crate::qsi::sampler::ensure_profiled;
use crate::search::rollout::replay;
use crate::search::{Search, SearchConfig, SearchStats};

/// The action an agent committed to, as handed to the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRef {
    pub intention: usize,
    pub node: NodeId,
}

pub struct Agent {
    name: String,
    beliefs: BeliefBase,
    intentions: Vec<Intention>,
    vision: Vision,
    config: SearchConfig,
    profile_samples: u32,
    /// Best full choice sequence kept across cycles by plan-carrying policies.
    carried: Vec<Choice>,
    /// Choices chosen by the last deliberation, consumed by `execute`.
    pending: Vec<Choice>,
    achieved: Vec<String>,
    last_search: Option<SearchStats>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        beliefs: BeliefBase,
        vision: Vision,
        config: SearchConfig,
    ) -> Self {
        Self {
            name: name.into(),
            beliefs,
            intentions: Vec::new(),
            vision,
            config,
            profile_samples: RunConfig::default().profile_samples,
            carried: Vec::new(),
            pending: Vec::new(),
            achieved: Vec::new(),
            last_search: None,
        }
    }

    pub fn with_profile_samples(mut self, samples: u32) -> Self {
        self.profile_samples = samples.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn beliefs(&self) -> &BeliefBase {
        &self.beliefs
    }

    pub fn intentions(&self) -> &[Intention] {
        &self.intentions
    }

    pub fn carried_plan(&self) -> &[Choice] {
        &self.carried
    }

    /// Counters of the most recent search, if one ran.
    pub fn last_search(&self) -> Option<&SearchStats> {
        self.last_search.as_ref()
    }

    /// Names of achieved top-level goals, in the order they were achieved.
    pub fn achieved(&self) -> &[String] {
        &self.achieved
    }

    /// Names of intentions whose top-level goal has failed.
    pub fn failed(&self) -> Vec<String> {
        self.intentions
            .iter()
            .filter(|i| i.status() == IntentionStatus::Failed)
            .map(|i| i.tree().name().to_string())
            .collect()
    }

    pub fn has_active_intentions(&self) -> bool {
        self.intentions.iter().any(|i| !i.is_finished())
    }

    /// Overwrite beliefs with the percepts the agent happens to see.
    pub fn sense<E: Environment, R: Rng>(&mut self, env: &mut E, rng: &mut R) {
        let percepts = env.current_percepts(&self.vision, rng);
        if !percepts.is_empty() {
            debug!(agent = %self.name, count = percepts.len(), "percepts");
        }
        self.beliefs.update_all(&percepts);
    }

    pub fn adopt_goals<I>(&mut self, trees: I)
    where
        I: IntoIterator<Item = Arc<GoalTree>>,
    {
        for tree in trees {
            debug!(agent = %self.name, goal = tree.name(), "adopt goal");
            self.intentions.push(Intention::new(tree));
        }
    }

    /// Search for the next choices; `None` when nothing is executable.
    ///
    /// Plan-carrying policies replay the kept sequence on the current state,
    /// swap in the search's best rollout when it does at least as well, and
    /// hand out its leading plan choices through the first action.
    #[instrument(skip_all, fields(agent = %self.name, policy = %self.config.policy))]
    pub fn deliberate<R: Rng>(&mut self, rng: &mut R) -> Result<Option<Vec<Choice>>, EngineError> {
        self.pending.clear();
        if !self.has_active_intentions() {
            self.carried.clear();
            return Ok(None);
        }
        if self.config.policy.uses_conflict_estimates() {
            for intention in &self.intentions {
                if ensure_profiled(intention.tree(), self.profile_samples, rng) {
                    debug!(
                        goal = intention.tree().name(),
                        samples = self.profile_samples,
                        "profiled goal"
                    );
                }
            }
        }

        let outcome = Search::new(&self.config, &self.intentions, &self.beliefs).run(rng)?;
        self.last_search = Some(outcome.stats.clone());

        let choices = if self.config.policy.carries_plan() {
            let (kept, applied) = replay(&self.carried, &self.intentions, &self.beliefs)?;
            self.carried.truncate(applied);
            if let Some(best) = outcome.best_rollout {
                if best.reward >= kept {
                    self.carried = best.choices;
                }
            }
            match self.carried.iter().position(Choice::is_action) {
                Some(end) => self.carried.drain(..=end).collect(),
                None => {
                    self.carried.clear();
                    outcome.best_choices
                }
            }
        } else {
            outcome.best_choices
        };

        if choices.is_empty() {
            debug!("nothing executable");
            return Ok(None);
        }
        self.pending = choices.clone();
        Ok(Some(choices))
    }

    /// Commit the pending plan choices and progress the chosen action.
    pub fn execute(&mut self) -> Result<Option<ActionRef>, EngineError> {
        let pending = std::mem::take(&mut self.pending);
        for choice in pending {
            let index = choice.intention();
            let count = self.intentions.len();
            let Some(intention) = self.intentions.get_mut(index) else {
                return Err(EngineError::violation(
                    "<none>",
                    format!("intention index out of range ({} intentions)", count),
                )
                .in_intention(index, Some(choice)));
            };
            match choice {
                Choice::SelectPlan { plan, .. } => {
                    intention
                        .progress_plan(plan)
                        .map_err(|err| err.in_intention(index, Some(choice)))?;
                }
                Choice::ExecuteAction { .. } => {
                    let Some(node) = intention.progress_action() else {
                        return Err(EngineError::violation(
                            intention.location(),
                            "action choice while the current step is not an action",
                        )
                        .in_intention(index, Some(choice)));
                    };
                    return Ok(Some(ActionRef {
                        intention: index,
                        node,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// The action node behind `action`.
    pub fn action(&self, action: &ActionRef) -> Option<&ActionNode> {
        let intention = self.intentions.get(action.intention)?;
        match &intention.tree().node(action.node).kind {
            NodeKind::Action(node) => Some(node),
            NodeKind::Goal(_) | NodeKind::Plan(_) => None,
        }
    }

    pub fn action_name(&self, action: &ActionRef) -> Option<&str> {
        self.action(action)?;
        let tree = self.intentions[action.intention].tree();
        Some(tree.node(action.node).name.as_str())
    }

    /// The environment executed `action`: believe its postconditions and advance.
    pub fn report_success(&mut self, action: ActionRef) -> Result<(), EngineError> {
        let post = self.checked_action(action)?.post.clone();
        self.beliefs.update_all(&post);
        let intention = &mut self.intentions[action.intention];
        intention
            .succeed()
            .map_err(|err| err.in_intention(action.intention, None))?;
        if intention.status() == IntentionStatus::Achieved {
            let goal = intention.tree().name().to_string();
            info!(agent = %self.name, goal = %goal, "goal achieved");
            self.achieved.push(goal);
        }
        Ok(())
    }

    /// The environment rejected `action`: backtrack its intention.
    pub fn report_failure(&mut self, action: ActionRef) -> Result<(), EngineError> {
        self.checked_action(action)?;
        let intention = &mut self.intentions[action.intention];
        intention
            .fail()
            .map_err(|err| err.in_intention(action.intention, None))?;
        if intention.status() == IntentionStatus::Failed {
            warn!(agent = %self.name, goal = intention.tree().name(), "goal failed");
        }
        Ok(())
    }

    /// The action `action` names, provided its intention is still at it.
    fn checked_action(&self, action: ActionRef) -> Result<&ActionNode, EngineError> {
        let Some(intention) = self.intentions.get(action.intention) else {
            return Err(EngineError::violation(
                "<none>",
                format!("intention index out of range ({} intentions)", self.intentions.len()),
            )
            .in_intention(action.intention, None));
        };
        if intention.cursor() != Some(action.node) {
            return Err(EngineError::violation(
                intention.location(),
                "reported action is not the current step",
            )
            .in_intention(action.intention, None));
        }
        self.action(&action).ok_or_else(|| {
            EngineError::violation(intention.location(), "reported step is not an action")
                .in_intention(action.intention, None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::scenario::{build_trees, initial_beliefs};
    use crate::search::SearchPolicy;
    use crate::test_support::{action, beliefs, goal, lit, plan, tree, two_action_scenario};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn agent(policy: SearchPolicy, start: BeliefBase) -> Agent {
        let config = SearchConfig {
            policy,
            iterations: 50,
            ..SearchConfig::default()
        };
        Agent::new("a", start, Vision::new(), config).with_profile_samples(20)
    }

    /// Without an override the sample count is the run config's default.
    #[test]
    fn profile_samples_default_to_run_config() {
        let agent = Agent::new("a", beliefs(&[]), Vision::new(), SearchConfig::default());
        assert_eq!(agent.profile_samples, RunConfig::default().profile_samples);
        assert_eq!(agent.with_profile_samples(0).profile_samples, 1);
    }

    /// Deliberate, execute and report twice: the single goal ends achieved.
    #[test]
    fn two_action_plan_reaches_achievement() {
        let scenario = two_action_scenario();
        let mut rng = StdRng::seed_from_u64(4);
        for policy in [SearchPolicy::Uct, SearchPolicy::SpMcts, SearchPolicy::QsiMcts] {
            let mut agent = agent(policy, initial_beliefs(&scenario).expect("beliefs"));
            agent.adopt_goals(build_trees(&scenario));
            for step in ["a1", "a2"] {
                let choices = agent.deliberate(&mut rng).expect("deliberate").expect("choices");
                assert!(choices.last().is_some_and(Choice::is_action));
                let act = agent.execute().expect("execute").expect("action");
                assert_eq!(agent.action_name(&act), Some(step));
                agent.report_success(act).expect("success");
            }
            let gpt = &agent.intentions()[0];
            assert_eq!(gpt.cursor(), None, "{policy}");
            assert_eq!(gpt.status(), IntentionStatus::Achieved);
            assert_eq!(agent.achieved(), ["g0".to_string()]);
            assert_eq!(agent.beliefs().probability("q"), Some(1.0));
            assert_eq!(agent.deliberate(&mut rng).expect("deliberate"), None);
        }
    }

    #[test]
    fn failure_backtracks_to_alternative_plan() {
        let mut agent = agent(SearchPolicy::Uct, beliefs(&[]));
        agent.adopt_goals([tree(goal(
            "g",
            vec![
                plan("first", &[], vec![action("a", &[], &[])]),
                plan("second", &[], vec![action("b", &[], &[])]),
            ],
        ))]);
        let mut rng = StdRng::seed_from_u64(2);
        agent.deliberate(&mut rng).expect("deliberate").expect("choices");
        let act = agent.execute().expect("execute").expect("action");
        let failed = agent.action_name(&act).map(str::to_string).expect("action node");
        agent.report_failure(act).expect("failure");
        assert!(agent.has_active_intentions());

        agent.deliberate(&mut rng).expect("deliberate").expect("choices");
        let act = agent.execute().expect("execute").expect("action");
        let retried = agent.action_name(&act).map(str::to_string).expect("action node");
        assert_ne!(failed, retried);
        agent.report_failure(act).expect("failure");
        assert_eq!(agent.failed(), vec!["g".to_string()]);
        assert!(agent.achieved().is_empty());
        assert_eq!(agent.deliberate(&mut rng).expect("deliberate"), None);
    }

    /// Reporting an action the intention has moved past is fatal.
    #[test]
    fn stale_report_is_a_violation() {
        let scenario = two_action_scenario();
        let mut agent = agent(SearchPolicy::Uct, initial_beliefs(&scenario).expect("beliefs"));
        agent.adopt_goals(build_trees(&scenario));
        let mut rng = StdRng::seed_from_u64(1);
        agent.deliberate(&mut rng).expect("deliberate");
        let act = agent.execute().expect("execute").expect("action");
        agent.report_success(act).expect("success");
        let err = agent.report_success(act).expect_err("stale");
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn execute_without_deliberation_is_idle() {
        let mut agent = agent(SearchPolicy::Uct, beliefs(&[]));
        assert_eq!(agent.execute().expect("execute"), None);
    }

    /// The kept sequence survives between cycles and is consumed from the front.
    #[test]
    fn single_player_policy_carries_its_plan() {
        let scenario = two_action_scenario();
        let mut agent = agent(SearchPolicy::SpMcts, initial_beliefs(&scenario).expect("beliefs"));
        agent.adopt_goals(build_trees(&scenario));
        let mut rng = StdRng::seed_from_u64(6);
        let first = agent.deliberate(&mut rng).expect("deliberate").expect("choices");
        assert_eq!(
            first,
            vec![
                Choice::SelectPlan { intention: 0, plan: 0 },
                Choice::ExecuteAction { intention: 0 }
            ]
        );
        assert_eq!(agent.carried_plan(), [Choice::ExecuteAction { intention: 0 }]);
        assert!(agent.last_search().is_some_and(|s| s.iterations == 50));
    }

    #[test]
    fn sense_applies_visible_percepts() {
        let mut agent = agent(SearchPolicy::Uct, beliefs(&["door-"]));
        let mut env = crate::test_support::ScriptedEnvironment::new(Vec::new())
            .with_percepts(vec![vec![lit("door+")]]);
        let mut rng = StdRng::seed_from_u64(0);
        agent.sense(&mut env, &mut rng);
        assert_eq!(agent.beliefs().probability("door"), Some(1.0));
    }
}
