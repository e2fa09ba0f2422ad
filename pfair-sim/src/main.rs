/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use pfair_sim::config::SimulationConfig;
use pfair_sim::scheduler::PFair;
use pfair_sim::simulation::{Mode, Simulation};
use pfair_sim::system::TaskSystem;

// ── CLI argument definition ───────────────────────────────────────────────────

/// PFair multiprocessor scheduling simulator.
///
/// Example:
///   pfair-sim -m 2 -l 60 -f sets/u150.txt --concurrent
#[derive(Debug, Parser)]
#[command(
    name = "pfair-sim",
    about = "PFair multiprocessor periodic task scheduling simulator",
    long_about = None,
)]
struct Cli {
    /// Number of processors (overrides the configuration file).
    #[arg(short = 'm', long = "processors")]
    processors: Option<usize>,

    /// Quanta to simulate; 0 runs one hyperperiod (overrides the configuration file).
    #[arg(short = 'l', long = "iterations")]
    iterations: Option<u64>,

    /// Path to a task-set file (overrides the configuration file).
    #[arg(short = 'f', long = "taskset")]
    taskset: Option<PathBuf>,

    /// Path to the YAML simulation configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Step selected tasks in per-processor workers.
    #[arg(long = "concurrent", default_value_t = false)]
    concurrent: bool,
}

impl Cli {
    /// Load the configuration file, if any, and apply CLI overrides.
    fn resolve(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load_from_file(path)?,
            None => {
                warn!("No configuration file provided, using defaults");
                SimulationConfig::default()
            }
        };

        if let Some(m) = self.processors {
            config.processors = m;
        }
        if let Some(l) = self.iterations {
            config.iterations = l;
        }
        if let Some(path) = &self.taskset {
            config.taskset = Some(path.clone());
        }
        if self.concurrent {
            config.mode = Mode::Concurrent;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load simulation configuration: {:#}", e);
            process::exit(1);
        }
    };

    info!(
        processors = config.processors,
        iterations = config.iterations,
        proportion = config.proportion,
        mode       = ?config.mode,
        taskset    = ?config.taskset,
        "Configuration"
    );

    // ── Admit tasks ───────────────────────────────────────────────────────────
    let mut system = TaskSystem::new(config.processors);
    for params in config.task_parameters() {
        if let Err(e) = system.add_task(params) {
            error!("{}", e);
            process::exit(1);
        }
    }
    info!("{}", system.summary());

    // ── Run ───────────────────────────────────────────────────────────────────
    let mut simulation = Simulation::new(system, Box::new(PFair))
        .with_mode(config.mode)
        .with_proportion(config.proportion);

    match simulation.run(config.iterations).await {
        Ok(report) => {
            for quantum in &report.quanta {
                let bindings: Vec<String> = quantum
                    .assignments
                    .iter()
                    .map(|(p, t)| format!("{p}:{t}"))
                    .collect();
                info!(t = quantum.time, "[{}]", bindings.join(" "));
            }
            info!("{} | t={}", report.summary, simulation.system().time());
        }
        Err(e) => {
            error!("Simulation aborted: {}", e);
            process::exit(1);
        }
    }
}
