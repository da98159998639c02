//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases};
use crate::report::aggregate;
use crate::run::run_case;

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    let cases_dir = repo_root.join("eval").join("cases");
    let cases = discover_cases(&cases_dir)?;
    for case in cases {
        println!("{} {}", case.case.id, case.case.scenario.display());
    }
    Ok(())
}

/// Run a case by id (optionally multiple times).
///
/// Run `n` uses `seed + n - 1`. Without a case seed a base seed is drawn and
/// printed so the batch can be replayed with `--seed`.
pub fn run_case_by_id(repo_root: &Path, case_id: &str, runs: u32, seed: Option<u64>) -> Result<()> {
    let cases_dir = repo_root.join("eval").join("cases");
    let case_path = cases_dir.join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    debug!(case_id, runs, "case loaded");

    let base_seed = seed
        .or(case.config.seed)
        .unwrap_or_else(rand::random::<u64>);
    info!(case_id, runs, base_seed, "starting runs");
    println!("run: case={case_id} base_seed={base_seed}");
    for run_num in 1..=runs {
        let run_seed = base_seed.wrapping_add(u64::from(run_num - 1));
        debug!(case_id, run_num, runs, run_seed, "starting run");
        let outcome = run_case(repo_root, &case_path, &case, run_num, Some(run_seed))
            .context("run case")?;
        println!(
            "run: case={} eval_run_id={} seed={} outcome={:?} achieved={}/{} results={}",
            case_id,
            outcome.eval_run_id,
            run_seed,
            outcome.outcome,
            outcome.achieved,
            outcome.goals,
            outcome.results_dir.display()
        );
    }
    Ok(())
}

/// Show aggregated results for a case.
pub fn report_case(repo_root: &Path, case_id: &str) -> Result<()> {
    let results_dir = repo_root.join("eval").join("results").join(case_id);
    let (summary, warnings) = aggregate(&results_dir)?;
    println!("report: case={} runs={}", case_id, summary.runs);
    println!(
        "report: success={} fail={} stuck={} error={}",
        summary.success, summary.fail, summary.stuck, summary.error
    );
    if let Some(avg) = summary.avg_duration_secs {
        println!("report: avg_duration_secs={:.2}", avg);
    }
    if let Some(achieved) = summary.mean_achieved {
        println!("report: mean_achieved={:.2}", achieved);
    }
    if let Some(cycles) = summary.mean_cycles {
        println!("report: mean_cycles={:.2}", cycles);
    }
    for (label, (passed, total)) in summary.check_pass_rates {
        println!("report: check {} {}/{}", label, passed, total);
    }
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

/// Remove stored results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    let case_results = repo_root.join("eval").join("results").join(case_id);
    if case_results.exists() {
        std::fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }
    println!("clean: case={} results={}", case_id, case_results.display());
    Ok(())
}
