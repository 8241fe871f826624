/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! compare-sim: run several tiersim strategies on one configuration.
//!
//! Every strategy gets a fresh simulator built from the same configuration
//! and seed, so differences in the table come from placement alone.
//!
//! Usage:
//!   compare-sim -c sim.yaml -r 50
//!   compare-sim --schedulers tier_priority,nearest --json compare.json

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use tiersim::config::SimConfig;
use tiersim::report::Discard;
use tiersim::scheduler::SchedulerRegistry;
use tiersim::server::Tier;
use tiersim::simulator::{RunSummary, Simulator};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "compare-sim",
    about = "Compare tiersim scheduling strategies on one configuration",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML simulation configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the round budget.
    #[arg(short = 'r', long = "rounds")]
    rounds: Option<u64>,

    /// Override the random seed.
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Comma-separated strategy names (default: every registered one).
    #[arg(long = "schedulers", value_delimiter = ',')]
    schedulers: Vec<String>,

    /// Write all summaries as a pretty JSON array to this file.
    #[arg(long = "json")]
    json: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,compare_sim=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
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

    let registry = SchedulerRegistry::with_builtins();
    let names = if cli.schedulers.is_empty() {
        registry.names()
    } else {
        cli.schedulers.clone()
    };
    if let Some(unknown) = names.iter().find(|n| !registry.contains(n)) {
        bail!(
            "unknown scheduler '{}' (valid: {})",
            unknown,
            registry.names().join(", ")
        );
    }

    info!(
        strategies = names.len(),
        rounds = config.rounds(),
        seed = config.simulation.seed,
        "Comparing strategies"
    );

    let mut summaries = Vec::with_capacity(names.len());
    for name in &names {
        let mut sim = Simulator::from_config(&config, &registry, name)
            .with_context(|| format!("Cannot build simulator for '{name}'"))?;
        let summary = sim
            .run(&mut Discard)
            .with_context(|| format!("Simulation with '{name}' failed"))?;
        info!(scheduler = %name, completed = summary.completed, "run finished");
        summaries.push(summary);
    }

    print_table(&summaries);

    if let Some(path) = &cli.json {
        let file = File::create(path)
            .with_context(|| format!("Cannot create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summaries)
            .context("Failed to write comparison JSON")?;
        info!("Comparison written to {}", path.display());
    }
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_table(summaries: &[RunSummary]) {
    println!(
        "{:<22} {:>8} {:>9} {:>8} {:>8} {:>7} {:>7} {:>7} {:>12} {:>13} {:>12} {:>9} {:>8}",
        "scheduler",
        "tasks",
        "completed",
        "expired",
        "unsched",
        "edge",
        "region",
        "cloud",
        "cost",
        "avg delay ms",
        "energy",
        "handover",
        "fail %",
    );
    println!("{}", "─".repeat(144));
    for s in summaries {
        let on = |tier: Tier| s.completed_by_tier.get(&tier).copied().unwrap_or(0);
        println!(
            "{:<22} {:>8} {:>9} {:>8} {:>8} {:>7} {:>7} {:>7} {:>12.4} {:>13.3} {:>12.6} {:>9} {:>8.2}",
            s.scheduler,
            s.total_tasks,
            s.completed,
            s.expired,
            s.unscheduled,
            on(Tier::Edge),
            on(Tier::Regional),
            on(Tier::Cloud),
            s.total_cost,
            s.avg_delay_ms,
            s.total_energy,
            s.handovers,
            s.failure_rate_pct,
        );
    }
}
