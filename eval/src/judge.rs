//! Check evaluation and outcome recording.
//!
//! Judges a finished episode against the case's checks.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use engine::looping::EpisodeOutcome;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::case::Check;

/// Collected check outcomes for a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct Judgment {
    pub checks: Vec<CheckOutcome>,
}

impl Judgment {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(CheckOutcome::passed)
    }
}

/// Result of a single check.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckOutcome {
    MinAchieved {
        count: usize,
        achieved: usize,
        passed: bool,
    },
    AllAchieved {
        goals: usize,
        achieved: usize,
        passed: bool,
    },
    MaxCycles {
        limit: u32,
        cycles: u32,
        passed: bool,
    },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        match self {
            CheckOutcome::MinAchieved { passed, .. }
            | CheckOutcome::AllAchieved { passed, .. }
            | CheckOutcome::MaxCycles { passed, .. } => *passed,
        }
    }

    /// Stable label used to group outcomes across runs.
    pub fn label(&self) -> String {
        match self {
            CheckOutcome::MinAchieved { count, .. } => format!("min_achieved({count})"),
            CheckOutcome::AllAchieved { .. } => "all_achieved".to_string(),
            CheckOutcome::MaxCycles { limit, .. } => format!("max_cycles({limit})"),
        }
    }
}

/// Evaluate all checks against an episode with `goals` top-level goals.
#[instrument(skip_all, fields(check_count = checks.len()))]
pub fn run_checks(checks: &[Check], episode: &EpisodeOutcome, goals: usize) -> Judgment {
    let achieved = episode.achieved.len();
    let outcomes = checks
        .iter()
        .map(|check| match check {
            Check::MinAchieved { count } => CheckOutcome::MinAchieved {
                count: *count,
                achieved,
                passed: achieved >= *count,
            },
            Check::AllAchieved => CheckOutcome::AllAchieved {
                goals,
                achieved,
                passed: achieved == goals,
            },
            Check::MaxCycles { cycles } => CheckOutcome::MaxCycles {
                limit: *cycles,
                cycles: episode.cycles,
                passed: episode.cycles <= *cycles,
            },
        })
        .collect::<Vec<_>>();
    debug!(
        passed = outcomes.iter().filter(|o| o.passed()).count(),
        total = outcomes.len(),
        "checks evaluated"
    );
    Judgment { checks: outcomes }
}

/// Write judgment to a JSON file.
pub fn write_judgment(path: &Path, judgment: &Judgment) -> Result<()> {
    let contents = serde_json::to_string_pretty(judgment).context("serialize judgment")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write judgment {}", path.display()))?;
    Ok(())
}
