#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crosscheck_sim::{CampaignConfig, run_campaign, run_single_seed};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "crosscheck-sim: randomized invariant campaign for the assignment engine",
    long_about = None
)]
struct Cli {
    /// Number of seeds to run, starting at 0.
    #[arg(long, default_value_t = 100)]
    seeds: u64,

    /// Operations per seed.
    #[arg(long, default_value_t = 48)]
    rounds: u64,

    /// Teams in the generated roster.
    #[arg(long, default_value_t = 8)]
    teams: usize,

    /// Subgroups the roster is spread across.
    #[arg(long, default_value_t = 3)]
    subgroups: usize,

    /// Projects in the generated world.
    #[arg(long, default_value_t = 6)]
    projects: usize,

    /// Per-team load cap.
    #[arg(long, default_value_t = 2)]
    cap: u32,

    /// Replay a single seed and print its full operation trace.
    #[arg(long)]
    replay: Option<u64>,

    /// Emit the campaign report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CampaignConfig {
        seed_range: 0..cli.seeds,
        team_count: cli.teams,
        subgroup_count: cli.subgroups,
        project_count: cli.projects,
        rounds: cli.rounds,
        load_cap: cli.cap,
    };

    if let Some(seed) = cli.replay {
        let (result, violations) = run_single_seed(seed, &config)?;
        for line in &result.trace {
            println!("{line}");
        }
        println!(
            "seed {seed}: applied={} rejected={} skipped={} violations={}",
            result.ops_applied,
            result.ops_rejected,
            result.ops_skipped,
            violations.len()
        );
        if !violations.is_empty() {
            for v in &violations {
                println!("  {v:?}");
            }
            std::process::exit(1);
        }
        return Ok(());
    }

    let report = run_campaign(&config)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "campaign complete: seeds={} passed={} first_failure={:?} ops_applied={} ops_rejected={}",
            report.seeds_run,
            report.seeds_passed,
            report.first_failure,
            report.total_ops_applied,
            report.total_ops_rejected
        );
        for failure in &report.failures {
            println!("seed {} failed:", failure.seed);
            for v in &failure.violations {
                println!("  {v}");
            }
        }
    }
    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
