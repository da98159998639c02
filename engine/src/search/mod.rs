//! Monte-Carlo Tree Search over plan and action choices.
//!
//! Each iteration selects a leaf of the search tree, expands every legal
//! choice sequence from the state it represents, samples one new child with
//! random rollouts (or a conflict estimate), and back-propagates the reward:
//! the number of intentions driven to completion or exhaustion.

pub mod expand;
pub mod mcts;
pub mod policy;
pub mod rollout;
pub mod stats;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use mcts::{Search, SearchOutcome, SearchStats};
pub use policy::SearchPolicy;

use crate::qsi::conflict::SubsetStrategy;

/// Guards divisions by zero visits and scales the tie-breaking jitter.
pub const EPSILON: f64 = 1e-6;

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub policy: SearchPolicy,
    /// Iterations per deliberation (α).
    pub iterations: u32,
    /// Rollouts per expanded node (β).
    pub rollouts: u32,
    /// Exploration weight C for the single-player score.
    pub exploration: f64,
    /// Variance smoothing constant D for the single-player score.
    pub variance_bias: f64,
    /// Conflict-free probability above which an estimate replaces rollouts (γ).
    pub fast_accept: f64,
    /// Conflict-free probability at or below which the target count is lowered (δ).
    pub fast_reject: f64,
    pub subsets: SubsetStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            policy: SearchPolicy::default(),
            iterations: 100,
            rollouts: 1,
            exploration: 0.1,
            variance_bias: 32.0,
            fast_accept: 0.5,
            fast_reject: 0.1,
            subsets: SubsetStrategy::default(),
        }
    }
}
