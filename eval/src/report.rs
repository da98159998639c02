use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine::looping::EpisodeOutcome;
use serde::de::DeserializeOwned;

use crate::judge::Judgment;
use crate::outcome::Outcome;
use crate::results::EvalMeta;

#[derive(Debug, Default)]
pub struct ReportSummary {
    pub runs: usize,
    pub success: usize,
    pub fail: usize,
    pub stuck: usize,
    pub error: usize,
    pub avg_duration_secs: Option<f64>,
    /// Mean achieved goals over runs whose episode finished.
    pub mean_achieved: Option<f64>,
    pub mean_cycles: Option<f64>,
    pub check_pass_rates: BTreeMap<String, (usize, usize)>,
}

pub fn load_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn aggregate(case_results_dir: &Path) -> Result<(ReportSummary, Vec<String>)> {
    let mut summary = ReportSummary::default();
    let mut warnings = Vec::new();
    let mut durations = Vec::new();
    let mut achieved = Vec::new();
    let mut cycles = Vec::new();

    for run_dir in load_run_dirs(case_results_dir)? {
        let meta: EvalMeta = match read_json(&run_dir.join("meta.json")) {
            Ok(meta) => meta,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: meta.json invalid ({err:#})",
                    run_dir.display()
                ));
                continue;
            }
        };
        let judgment: Judgment = match read_json(&run_dir.join("judgment.json")) {
            Ok(judgment) => judgment,
            Err(err) => {
                warnings.push(format!(
                    "skip {}: judgment.json invalid ({err:#})",
                    run_dir.display()
                ));
                continue;
            }
        };

        summary.runs += 1;
        match meta.outcome {
            Some(Outcome::Success) => summary.success += 1,
            Some(Outcome::Fail) => summary.fail += 1,
            Some(Outcome::Stuck) => summary.stuck += 1,
            Some(Outcome::Error) | None => summary.error += 1,
        }
        durations.push(meta.duration_secs);

        let outcome_path = run_dir.join("outcome.json");
        if outcome_path.exists() {
            match read_json::<EpisodeOutcome>(&outcome_path) {
                Ok(episode) => {
                    achieved.push(episode.achieved.len() as f64);
                    cycles.push(f64::from(episode.cycles));
                }
                Err(err) => warnings.push(format!(
                    "{}: outcome.json invalid ({err:#})",
                    run_dir.display()
                )),
            }
        }

        for check in &judgment.checks {
            let entry = summary.check_pass_rates.entry(check.label()).or_insert((0, 0));
            if check.passed() {
                entry.0 += 1;
            }
            entry.1 += 1;
        }
    }

    summary.avg_duration_secs = mean(&durations);
    summary.mean_achieved = mean(&achieved);
    summary.mean_cycles = mean(&cycles);
    Ok((summary, warnings))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
