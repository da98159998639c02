//! Deliberation engine for BDI-style agents.
//!
//! An agent pursues several goal-plan trees at once. Every cycle it searches
//! over sequences of plan and action choices with Monte-Carlo Tree Search and
//! commits to the next action. The crate is layered:
//!
//! - **[`core`]**: Pure, deterministic model (literals, beliefs, goal-plan trees,
//!   the intention state machine). Randomness is always injected by the caller.
//! - **[`search`]**: MCTS engine with UCT, single-player and conflict-aware policies.
//! - **[`qsi`]**: Offline path sampling and the conflict-probability estimator
//!   used by the conflict-aware policy.
//! - **[`io`]**: Side-effecting edges (config and scenario files, environments).
//!
//! Orchestration modules ([`agent`], [`step`], [`looping`]) drive the per-cycle
//! sense/deliberate/execute loop on top of these layers.

pub mod agent;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod qsi;
pub mod search;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
