/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use tiersim::config::SimConfig;
use tiersim::report::{Discard, JsonLinesReporter};
use tiersim::scheduler::SchedulerRegistry;
use tiersim::simulator::Simulator;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Edge / Regional / Cloud task placement simulator.
///
/// Example:
///   tiersim -c sim.yaml -s nearest -r 100 -o rounds.jsonl --summary summary.json
#[derive(Debug, Parser)]
#[command(
    name = "tiersim",
    about = "Discrete-round task placement simulator for Edge / Regional / Cloud tiers",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML simulation configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Scheduling strategy.
    #[arg(short = 's', long = "scheduler", default_value = "tier_priority")]
    scheduler: String,

    /// Override the round budget.
    #[arg(short = 'r', long = "rounds")]
    rounds: Option<u64>,

    /// Override the random seed.
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Write one JSON object per round to this file.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write the run summary as pretty JSON to this file.
    #[arg(long = "summary")]
    summary: Option<PathBuf>,

    /// Print the available strategies and exit.
    #[arg(long = "list-schedulers", default_value_t = false)]
    list_schedulers: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = SchedulerRegistry::with_builtins();

    if cli.list_schedulers {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    info!(
        config    = ?cli.config,
        scheduler = %cli.scheduler,
        rounds    = ?cli.rounds,
        seed      = ?cli.seed,
        output    = ?cli.output,
        "Configuration"
    );

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using the reference three-tier setup");
            SimConfig::default()
        }
    };
    if let Some(rounds) = cli.rounds {
        config.simulation.rounds = Some(rounds);
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut sim = Simulator::from_config(&config, &registry, &cli.scheduler)?;

    let summary = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create output file: {}", path.display()))?;
            let mut reporter = JsonLinesReporter::new(BufWriter::new(file));
            let summary = sim.run(&mut reporter)?;
            reporter
                .into_inner()
                .flush()
                .with_context(|| format!("Cannot flush output file: {}", path.display()))?;
            info!("Round reports written to {}", path.display());
            summary
        }
        None => sim.run(&mut Discard)?,
    };

    info!(
        "Summary [{}]: {} task(s), {} completed, {} expired, {} unscheduled, failure rate {:.2}%",
        summary.scheduler,
        summary.total_tasks,
        summary.completed,
        summary.expired,
        summary.unscheduled,
        summary.failure_rate_pct,
    );
    info!(
        "  cost={:.4}  avg_delay={:.3}ms  energy={:.6}  handovers={}",
        summary.total_cost, summary.avg_delay_ms, summary.total_energy, summary.handovers,
    );
    for (tier, count) in &summary.completed_by_tier {
        info!("  {tier}: {count} task(s)");
    }

    if let Some(path) = &cli.summary {
        let file = File::create(path)
            .with_context(|| format!("Cannot create summary file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .context("Failed to write run summary")?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
