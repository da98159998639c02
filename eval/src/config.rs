//! Engine configuration merging.
//!
//! Applies case-specific overrides to the default engine configuration.

use anyhow::Result;
use engine::io::config::EngineConfig;

use crate::case::CaseConfig;

/// Apply case configuration overrides to the base engine config.
///
/// `seed` replaces any seed from the base; `None` leaves the engine to draw one.
pub fn apply_case_config(
    mut base: EngineConfig,
    overrides: &CaseConfig,
    seed: Option<u64>,
) -> Result<EngineConfig> {
    if let Some(policy) = overrides.policy {
        base.search.policy = policy;
    }
    if let Some(iterations) = overrides.iterations {
        base.search.iterations = iterations;
    }
    if let Some(rollouts) = overrides.rollouts {
        base.search.rollouts = rollouts;
    }
    if let Some(fast_accept) = overrides.fast_accept {
        base.search.fast_accept = fast_accept;
    }
    if let Some(fast_reject) = overrides.fast_reject {
        base.search.fast_reject = fast_reject;
    }
    if let Some(max_cycles) = overrides.max_cycles {
        base.run.max_cycles = max_cycles;
    }
    if let Some(samples) = overrides.profile_samples {
        base.run.profile_samples = samples;
    }
    base.run.seed = seed;
    base.validate()?;
    Ok(base)
}
