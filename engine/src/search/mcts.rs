//! One MCTS deliberation over a fixed snapshot of intentions and beliefs.

use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::core::belief::BeliefBase;
use crate::core::choice::{Choice, apply_choice, finished_count};
use crate::core::intention::Intention;
use crate::error::EngineError;
use crate::qsi::conflict::prob_achievable;
use crate::qsi::profile::ProfileCache;
use crate::search::SearchConfig;
use crate::search::expand::legal_choices;
use crate::search::rollout::{Rollout, rollout};
use crate::search::stats::Statistic;
use crate::search::tree::{SearchId, SearchTree};

/// Counters describing how a search spent its budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub iterations: u32,
    pub rollouts: u32,
    /// Expansions valued by the conflict estimate instead of rollouts.
    pub fast_accepts: u32,
    /// Times the estimate lowered the target number of intentions.
    pub fast_rejects: u32,
    /// Iterations that ended on a leaf with no legal choice.
    pub terminal_leaves: u32,
    pub nodes: usize,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Edge choices of the root's best child; empty when nothing is executable.
    pub best_choices: Vec<Choice>,
    /// Highest-reward playout seen, with its full choice sequence from the root.
    pub best_rollout: Option<Rollout>,
    pub root: Statistic,
    pub stats: SearchStats,
}

/// Search context: the root snapshot, the growing tree and the best playout.
///
/// Every iteration works on its own clone of the snapshot; the snapshot
/// itself is never mutated.
pub struct Search<'a> {
    config: &'a SearchConfig,
    intentions: &'a [Intention],
    beliefs: &'a BeliefBase,
    tree: SearchTree,
    profiles: ProfileCache,
    best: Option<Rollout>,
    stats: SearchStats,
}

impl<'a> Search<'a> {
    pub fn new(
        config: &'a SearchConfig,
        intentions: &'a [Intention],
        beliefs: &'a BeliefBase,
    ) -> Self {
        Self {
            config,
            intentions,
            beliefs,
            tree: SearchTree::new(),
            profiles: ProfileCache::new(),
            best: None,
            stats: SearchStats::default(),
        }
    }

    #[instrument(
        skip_all,
        fields(policy = %self.config.policy, intentions = self.intentions.len())
    )]
    pub fn run<R: Rng>(mut self, rng: &mut R) -> Result<SearchOutcome, EngineError> {
        for _ in 0..self.config.iterations {
            self.iterate(rng)?;
            self.stats.iterations += 1;
        }
        let root = self.tree.root();
        let best_choices = self
            .tree
            .best_child(root)
            .map(|child| self.tree.node(child).choices.clone())
            .unwrap_or_default();
        self.stats.nodes = self.tree.len();
        debug!(
            iterations = self.stats.iterations,
            rollouts = self.stats.rollouts,
            fast_accepts = self.stats.fast_accepts,
            nodes = self.stats.nodes,
            best_reward = self.best.as_ref().map(|b| b.reward),
            "search finished"
        );
        Ok(SearchOutcome {
            best_choices,
            best_rollout: self.best,
            root: self.tree.node(root).stats,
            stats: self.stats,
        })
    }

    fn iterate<R: Rng>(&mut self, rng: &mut R) -> Result<(), EngineError> {
        let (mut path, mut choices) = self.select(rng);
        let leaf = *path.last().unwrap_or(&self.tree.root());

        let mut state = self.intentions.to_vec();
        let mut beliefs = self.beliefs.clone();
        for choice in &choices {
            apply_choice(&mut state, &mut beliefs, choice)?;
        }

        for seq in legal_choices(&state, &beliefs) {
            self.tree.add_child(leaf, seq);
        }
        let children = self.tree.children(leaf);
        if children.is_empty() {
            let reward = finished_count(&state) as f64;
            self.stats.terminal_leaves += 1;
            self.backpropagate(&path, reward);
            self.record_best(reward, choices);
            return Ok(());
        }

        let child = children[rng.gen_range(0..children.len())];
        for choice in &self.tree.node(child).choices {
            apply_choice(&mut state, &mut beliefs, choice)?;
            choices.push(*choice);
        }
        path.push(child);

        if self.config.policy.uses_conflict_estimates() {
            if let Some(reward) = self.estimate(&state, rng) {
                self.stats.fast_accepts += 1;
                self.backpropagate(&path, reward);
                return Ok(());
            }
        }

        for _ in 0..self.config.rollouts {
            let playout = rollout(&state, &beliefs, rng)?;
            self.stats.rollouts += 1;
            self.backpropagate(&path, playout.reward);
            let mut full = choices.clone();
            full.extend(playout.choices);
            self.record_best(playout.reward, full);
        }
        Ok(())
    }

    /// Descend by policy score to a node without children.
    fn select<R: Rng>(&self, rng: &mut R) -> (Vec<SearchId>, Vec<Choice>) {
        let mut current = self.tree.root();
        let mut path = vec![current];
        let mut choices = Vec::new();
        loop {
            let parent_visits = self.tree.node(current).stats.visits();
            let mut best: Option<(SearchId, f64)> = None;
            for child in self.tree.children(current) {
                let score = self.config.policy.score(
                    &self.tree.node(*child).stats,
                    parent_visits,
                    self.config,
                    rng.r#gen::<f64>(),
                );
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((*child, score));
                }
            }
            let Some((next, _)) = best else {
                return (path, choices);
            };
            choices.extend_from_slice(&self.tree.node(next).choices);
            path.push(next);
            current = next;
        }
    }

    /// Conflict-based value for a freshly expanded state, if the estimate is decisive.
    ///
    /// Starts from "every intention is achieved" and asks whether enough of
    /// the unfinished ones can run together without conflict. A confident yes
    /// returns that count; a confident no lowers the target and retries;
    /// anything in between defers to rollouts.
    fn estimate<R: Rng>(&mut self, state: &[Intention], rng: &mut R) -> Option<f64> {
        let finished = finished_count(state);
        let active: Vec<usize> = (0..state.len()).filter(|&i| !state[i].is_finished()).collect();
        let profiles = self.profiles.profiles(state, &active);
        let mut target = state.len();
        while target > finished + 1 {
            let together = target - finished;
            let prob = prob_achievable(
                &profiles,
                together,
                self.config.subsets,
                self.config.fast_accept,
                rng,
            );
            if prob > self.config.fast_accept {
                return Some(target as f64);
            }
            if prob > self.config.fast_reject {
                return None;
            }
            self.stats.fast_rejects += 1;
            target -= 1;
        }
        None
    }

    fn backpropagate(&mut self, path: &[SearchId], reward: f64) {
        for id in path {
            self.tree.stats_mut(*id).add(reward);
        }
    }

    fn record_best(&mut self, reward: f64, choices: Vec<Choice>) {
        if self.best.as_ref().is_none_or(|b| reward > b.reward) {
            self.best = Some(Rollout { reward, choices });
        }
    }
}
