/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Plain-text task-set files.
//!
//! The expected layout is:
//! ```text
//! 0.95        # optional: advisory total utilisation
//! 3           # optional: number of entries that follow
//! 1,2         # C,T
//! 2,5
//! 1;10
//! ```
//!
//! Any single non-numeric separator works between `C` and `T`.  Blank lines
//! and `#` comments are ignored, malformed lines are skipped with a warning.
//! A file that cannot be read yields an empty task set: this is the only
//! recoverable input failure in the simulator.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::task::{Parameters, Time};

/// Parsed task-set file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    /// Total utilisation announced by the file.  Informational only.
    pub advisory_utilization: Option<f64>,

    /// Entry count announced by the file.
    pub declared_count: Option<usize>,

    /// `(C, T)` pairs in file order.
    pub entries: Vec<(Time, Time)>,
}

impl TaskSet {
    /// Implicit-deadline, zero-phase parameters for every entry.
    pub fn params(&self) -> Vec<Parameters> {
        self.entries
            .iter()
            .map(|&(c, t)| Parameters::new(c, t))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse task-set text.
pub fn parse(content: &str) -> TaskSet {
    let mut header: Vec<&str> = Vec::new();
    let mut entries = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line
            .split(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-'))
            .filter(|tok| !tok.is_empty())
            .collect();

        match tokens.as_slice() {
            [single] if entries.is_empty() && header.len() < 2 => header.push(*single),
            [c, t] => match (c.parse::<Time>(), t.parse::<Time>()) {
                (Ok(c), Ok(t)) => entries.push((c, t)),
                _ => warn!(line = lineno + 1, content = raw, "skipping malformed task entry"),
            },
            _ => warn!(line = lineno + 1, content = raw, "skipping unrecognised line"),
        }
    }

    // Two header values are "U, N"; a lone value is N if integral, else U
    let (advisory_utilization, declared_count): (Option<f64>, Option<usize>) = match header.as_slice() {
        [u, n] => (u.parse().ok(), n.parse().ok()),
        [only] if only.contains('.') => (only.parse().ok(), None),
        [only] => (None, only.parse().ok()),
        _ => (None, None),
    };

    if let Some(n) = declared_count {
        if entries.len() > n {
            debug!(declared = n, found = entries.len(), "ignoring entries past the declared count");
            entries.truncate(n);
        } else if entries.len() < n {
            warn!(declared = n, found = entries.len(), "task set is shorter than declared");
        }
    }

    TaskSet {
        advisory_utilization,
        declared_count,
        entries,
    }
}

/// Read and parse a task-set file.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn try_load(path: &Path) -> Result<TaskSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open task set file: {}", path.display()))?;
    let set = parse(&content);
    info!(
        path = %path.display(),
        tasks = set.entries.len(),
        advisory_utilization = ?set.advisory_utilization,
        "Loaded task set"
    );
    Ok(set)
}

/// Read a task-set file, yielding an empty set if it cannot be read.
pub fn load(path: &Path) -> TaskSet {
    try_load(path).unwrap_or_else(|e| {
        warn!("{:#}, continuing with an empty task set", e);
        TaskSet::default()
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
