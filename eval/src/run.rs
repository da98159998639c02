//! Case execution orchestration.
//!
//! Runs one episode in-process, judges it and captures the results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use engine::io::config::EngineConfig;
use engine::io::scenario::load_scenario;
use engine::looping::run_scenario;
use tracing::{debug, info, instrument, warn};

use crate::case::CaseFile;
use crate::config::apply_case_config;
use crate::judge::{Judgment, run_checks, write_judgment};
use crate::outcome::{Outcome, classify_outcome};
use crate::results::{CaptureInput, capture_results, update_outcome};

/// Result of running a single case.
#[derive(Debug)]
pub struct RunOutcome {
    /// Unique identifier for this eval run.
    pub eval_run_id: String,
    /// Path to the results directory.
    pub results_dir: PathBuf,
    /// Classified outcome.
    pub outcome: Outcome,
    pub achieved: usize,
    pub goals: usize,
}

/// Run a case end-to-end: scenario load, episode, checks, result capture.
///
/// Scenario and config problems are errors. An episode that errors mid-run is
/// recorded as [`Outcome::Error`].
#[instrument(skip_all, fields(case_id = %case.case.id, run_num = run_num))]
pub fn run_case(
    repo_root: &Path,
    case_path: &Path,
    case: &CaseFile,
    run_num: u32,
    seed: Option<u64>,
) -> Result<RunOutcome> {
    info!("case run started");

    let scenario_path = repo_root.join(&case.case.scenario);
    let scenario = load_scenario(&scenario_path).context("load scenario")?;
    let cfg = apply_case_config(EngineConfig::default(), &case.config, seed)?;
    let goals = scenario.goals.len();

    let started_at = Utc::now();
    let eval_run_id = eval_run_id(started_at, run_num);
    let result = run_scenario(&scenario, &cfg, |cycle, outcome| {
        debug!(cycle, ?outcome, "cycle finished");
    });
    let finished_at = Utc::now();

    let (episode, error) = match result {
        Ok(episode) => (Some(episode), None),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "episode errored");
            (None, Some(format!("{err:#}")))
        }
    };

    let capture_input = CaptureInput {
        case_id: &case.case.id,
        case_path,
        scenario_path: &scenario_path,
        eval_run_id: &eval_run_id,
        policy: cfg.search.policy.to_string(),
        seed,
        episode: episode.as_ref(),
        error,
        started_at,
        finished_at,
        repo_root,
    };
    let results_dir = capture_results(&repo_root.join("eval").join("results"), &capture_input)
        .context("capture results")?;

    let judgment = match &episode {
        Some(episode) => run_checks(&case.checks, episode, goals),
        None => Judgment { checks: Vec::new() },
    };
    write_judgment(&results_dir.join("judgment.json"), &judgment).context("write judgment")?;

    let outcome = classify_outcome(episode.as_ref(), &judgment);
    update_outcome(&results_dir, outcome).context("update outcome")?;

    let achieved = episode.as_ref().map_or(0, |e| e.achieved.len());
    info!(
        outcome = ?outcome,
        achieved,
        goals,
        results_dir = %results_dir.display(),
        "case run complete"
    );

    Ok(RunOutcome {
        eval_run_id,
        results_dir,
        outcome,
        achieved,
        goals,
    })
}

fn eval_run_id(started_at: chrono::DateTime<Utc>, run_num: u32) -> String {
    format!("eval-{}-{run_num:03}", started_at.format("%Y%m%d_%H%M%S"))
}
