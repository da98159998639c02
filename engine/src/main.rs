//! Command-line front end for the deliberation engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use engine::agent::Agent;
use engine::core::tree::NodeKind;
use engine::exit_codes;
use engine::io::config::{EngineConfig, load_config};
use engine::io::scenario::{build_trees, initial_beliefs, load_scenario, vision};
use engine::looping::{LoopStop, run_scenario};
use engine::qsi::sampler::sample_tree;
use engine::search::SearchPolicy;
use engine::step::CycleOutcome;

#[derive(Parser)]
#[command(
    name = "engine",
    version,
    about = "MCTS deliberation engine for BDI agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a scenario against the schema and semantic invariants.
    Validate {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Run one deliberation on the scenario's initial state and print the choices.
    Deliberate {
        #[arg(long)]
        scenario: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Run a full episode against the scenario's synthetic world.
    Run {
        #[arg(long)]
        scenario: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Sample execution paths and print per-goal conflict statistics.
    Profile {
        #[arg(long)]
        scenario: PathBuf,
        /// Paths sampled per plan.
        #[arg(long, default_value_t = 1000)]
        samples: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args)]
struct Overrides {
    /// Engine config (TOML). Defaults apply when the file is missing.
    #[arg(long, default_value = "engine.toml")]
    config: PathBuf,
    #[arg(long)]
    seed: Option<u64>,
    /// One of uct, sp_mcts, qsi_mcts.
    #[arg(long)]
    policy: Option<SearchPolicy>,
}

impl Overrides {
    fn load(&self) -> Result<EngineConfig> {
        let mut cfg = load_config(&self.config)?;
        if let Some(seed) = self.seed {
            cfg.run.seed = Some(seed);
        }
        if let Some(policy) = self.policy {
            cfg.search.policy = policy;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() {
    engine::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILURE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate { scenario } => cmd_validate(&scenario),
        Command::Deliberate {
            scenario,
            overrides,
        } => cmd_deliberate(&scenario, &overrides.load()?),
        Command::Run {
            scenario,
            overrides,
        } => cmd_run(&scenario, &overrides.load()?),
        Command::Profile {
            scenario,
            samples,
            seed,
        } => cmd_profile(&scenario, samples, seed),
    }
}

fn cmd_validate(path: &Path) -> Result<i32> {
    match load_scenario(path) {
        Ok(scenario) => {
            println!(
                "ok: {} literals, {} goals",
                scenario.literals.len(),
                scenario.goals.len()
            );
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("{:#}", err);
            Ok(exit_codes::INVALID)
        }
    }
}

fn cmd_deliberate(path: &Path, cfg: &EngineConfig) -> Result<i32> {
    let scenario = load_scenario(path)?;
    let seed = cfg.run.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut agent = Agent::new(
        "cli",
        initial_beliefs(&scenario)?,
        vision(&scenario),
        cfg.search.clone(),
    )
    .with_profile_samples(cfg.run.profile_samples);
    agent.adopt_goals(build_trees(&scenario));

    let choices = agent.deliberate(&mut rng).context("deliberate")?;
    if let Some(stats) = agent.last_search() {
        println!(
            "seed {} | {} iterations, {} rollouts, {} fast accepts, {} nodes",
            seed, stats.iterations, stats.rollouts, stats.fast_accepts, stats.nodes
        );
    }
    let Some(choices) = choices else {
        println!("nothing executable");
        return Ok(exit_codes::IDLE);
    };
    let rendered: Vec<String> = choices.iter().map(ToString::to_string).collect();
    println!("{}", rendered.join(" "));
    if let Some(action) = agent.execute()? {
        let name = agent.action_name(&action).unwrap_or("<unknown>");
        println!("next action: {} (intention {})", name, action.intention);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(path: &Path, cfg: &EngineConfig) -> Result<i32> {
    let scenario = load_scenario(path)?;
    let outcome = run_scenario(&scenario, cfg, |cycle, step| {
        if let CycleOutcome::Executed {
            intention,
            action,
            succeeded,
            ..
        } = step
        {
            let verdict = if *succeeded { "ok" } else { "failed" };
            println!("[{:>4}] {} <- intention {} ({})", cycle, action, intention, verdict);
        }
    })?;
    let stop = match outcome.stop {
        LoopStop::Idle => "idle".to_string(),
        LoopStop::MaxCyclesExceeded { max_cycles } => format!("max cycles ({})", max_cycles),
    };
    println!(
        "seed {} | {} cycles | achieved {}/{} | stop: {}",
        outcome.seed,
        outcome.cycles,
        outcome.achieved.len(),
        scenario.goals.len(),
        stop
    );
    if !outcome.achieved.is_empty() {
        println!("achieved: {}", outcome.achieved.join(", "));
    }
    if !outcome.failed.is_empty() {
        println!("failed: {}", outcome.failed.join(", "));
    }
    Ok(exit_codes::OK)
}

fn cmd_profile(path: &Path, samples: u32, seed: Option<u64>) -> Result<i32> {
    let scenario = load_scenario(path)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    println!("seed {} | {} samples per plan", seed, samples);
    for tree in build_trees(&scenario) {
        let stats = sample_tree(&tree, samples.max(1), &mut rng);
        for id in tree.ids() {
            if !matches!(tree.node(id).kind, NodeKind::Goal(_)) {
                continue;
            }
            let node = &stats[id.index()];
            println!(
                "{}: average length {:.2} over {} runs",
                tree.path(id),
                node.average_length(),
                node.runs
            );
            let runs = node.runs.max(1) as f64;
            for (lit, count) in &node.fragility {
                println!("  fragile     {:<16} {:.3}", lit.to_string(), *count as f64 / runs);
            }
            for (lit, count) in &node.establishment {
                println!("  establishes {:<16} {:.3}", lit.to_string(), *count as f64 / runs);
            }
        }
    }
    Ok(exit_codes::OK)
}
