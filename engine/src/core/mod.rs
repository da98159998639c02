//! Deterministic, pure model shared by search, estimator and agent.
//!
//! Core modules are free of I/O. Anything random takes an injected `Rng`.

pub mod belief;
pub mod choice;
pub mod intention;
pub mod invariants;
pub mod literal;
pub mod tree;
pub mod types;
