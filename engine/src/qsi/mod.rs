//! Quantitative simulation information (QSI): conflict estimates between intentions.
//!
//! [`sampler`] walks random execution paths through each plan once, offline,
//! and stores per-node fragility/establishment totals on the tree.
//! [`profile`] folds those totals into averages over what an intention still
//! has to do, and [`conflict`] turns pairs of profiles into the probability
//! that one intention undoes a precondition the other relies on.

pub mod conflict;
pub mod profile;
pub mod sampler;
