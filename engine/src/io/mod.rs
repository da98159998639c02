//! Side-effecting edges: config and scenario files, environments.

pub mod config;
pub mod environment;
pub mod scenario;
