//! Engine configuration (TOML): search parameters and episode settings.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::qsi::conflict::SubsetStrategy;
use crate::search::SearchConfig;

/// Engine configuration.
///
/// Missing fields take their defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for every random draw of an episode. Drawn from entropy when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Cycles after which a run stops even if intentions remain.
    pub max_cycles: u32,

    /// Paths sampled per goal-plan tree before conflict estimates are used.
    pub profile_samples: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_cycles: 1000,
            profile_samples: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if search.iterations == 0 {
            return Err(anyhow!("search.iterations must be > 0"));
        }
        if search.rollouts == 0 {
            return Err(anyhow!("search.rollouts must be > 0"));
        }
        if !search.exploration.is_finite() || search.exploration < 0.0 {
            return Err(anyhow!("search.exploration must be >= 0"));
        }
        if !search.variance_bias.is_finite() || search.variance_bias < 0.0 {
            return Err(anyhow!("search.variance_bias must be >= 0"));
        }
        let unit = 0.0..=1.0;
        if !unit.contains(&search.fast_accept) || !unit.contains(&search.fast_reject) {
            return Err(anyhow!(
                "search.fast_accept and search.fast_reject must be within [0, 1]"
            ));
        }
        if search.fast_reject > search.fast_accept {
            return Err(anyhow!(
                "search.fast_reject ({}) must not exceed search.fast_accept ({})",
                search.fast_reject,
                search.fast_accept
            ));
        }
        if search.subsets == (SubsetStrategy::Sampled { trials: Some(0) }) {
            return Err(anyhow!("search.subsets.trials must be > 0"));
        }
        if self.run.max_cycles == 0 {
            return Err(anyhow!("run.max_cycles must be > 0"));
        }
        if self.run.profile_samples == 0 {
            return Err(anyhow!("run.profile_samples must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Parse and validate config text.
pub fn parse_config(contents: &str) -> Result<EngineConfig> {
    let cfg: EngineConfig = toml::from_str(contents)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
