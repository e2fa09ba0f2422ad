/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation run configuration.
//!
//! The expected YAML structure is:
//! ```yaml
//! processors: 2
//! iterations: 0          # 0 = one hyperperiod
//! proportion: 1
//! mode: concurrent       # or "sequential"
//! taskset: sets/u150.txt # relative to this file
//! tasks:
//!   - { c: 1, t: 2 }
//!   - { c: 2, t: 5, d: 4, o: 1 }
//! ```
//!
//! Every key is optional.  Tasks from the task-set file are admitted before
//! the inline ones.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::simulation::Mode;
use crate::task::{Parameters, Time};
use crate::taskset;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SimulationConfigFile {
    processors: usize,
    iterations: u64,
    proportion: Time,
    mode: Mode,
    taskset: Option<PathBuf>,
    tasks: Vec<TaskEntry>,
}

impl Default for SimulationConfigFile {
    fn default() -> Self {
        Self {
            processors: 1,
            iterations: 0,
            proportion: 1,
            mode: Mode::default(),
            taskset: None,
            tasks: Vec::new(),
        }
    }
}

/// One inline task.  `d` of 0 means implicit deadline.
#[derive(Debug, Deserialize)]
struct TaskEntry {
    c: Time,
    t: Time,
    #[serde(default)]
    d: Time,
    #[serde(default)]
    o: Time,
}

impl From<TaskEntry> for Parameters {
    fn from(entry: TaskEntry) -> Self {
        Parameters::new(entry.c, entry.t)
            .with_deadline(entry.d)
            .with_offset(entry.o)
    }
}

// ── SimulationConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub processors: usize,
    /// Quanta to simulate; `0` means one hyperperiod.
    pub iterations: u64,
    pub proportion: Time,
    pub mode: Mode,
    /// Task-set file, already resolved against the config file's directory.
    pub taskset: Option<PathBuf>,
    pub tasks: Vec<Parameters>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfigFile::default().resolve(None)
    }
}

impl SimulationConfigFile {
    fn resolve(self, base: Option<&Path>) -> SimulationConfig {
        let taskset = match (self.taskset, base) {
            (Some(path), Some(base)) if path.is_relative() => Some(base.join(path)),
            (path, _) => path,
        };
        SimulationConfig {
            processors: self.processors,
            iterations: self.iterations,
            proportion: self.proportion,
            mode: self.mode,
            taskset,
            tasks: self.tasks.into_iter().map(Parameters::from).collect(),
        }
    }
}

impl SimulationConfig {
    /// Parse the YAML configuration at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: SimulationConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let config = file.resolve(path.parent());
        debug!(
            processors = config.processors,
            iterations = config.iterations,
            proportion = config.proportion,
            mode = ?config.mode,
            taskset = ?config.taskset,
            inline_tasks = config.tasks.len(),
            "simulation configuration"
        );
        Ok(config)
    }

    /// Every task to admit: the task-set file's entries followed by the
    /// inline ones.
    pub fn task_parameters(&self) -> Vec<Parameters> {
        let mut params = self
            .taskset
            .as_deref()
            .map(|path| taskset::load(path).params())
            .unwrap_or_default();
        params.extend(self.tasks.iter().copied());
        params
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
