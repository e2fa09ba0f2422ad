/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Quantum-level task selection.
//!
//! [`PFair`] implements the Proportional Fair decision rule behind the
//! [`Scheduler`] trait: a pure function from `(t, m, ready snapshot)` to the
//! ready-pool indices that run in the next quantum.
//!
//! # Definitions
//! For a task with parameters `(C, T, U = C/T)` and attributes
//! `(Ct, releases)`:
//!
//! * `lag(t) = t·U − (releases·C − Ct)` – ideal fluid service minus actual
//!   service.  Positive means the task is behind.
//! * `symbol(t) = sign((t+1)·U − ⌊t·U⌋ − 1)` – whether the ideal allocation
//!   crosses an integer boundary in slot `t`.
//!
//! | Class | Condition | Effect |
//! |---|---|---|
//! | Urgent | `lag > 0 ∧ symbol ≥ 0` | always selected |
//! | Tnegru | `lag < 0 ∧ symbol ≤ 0` | never selected this slot |
//! | Contending | otherwise | fills the remaining processors |
//!
//! Contenders are admitted in ready-pool order while `symbol ≥ 0` at the
//! probe time; when none qualifies the probe time advances by one.  Ties are
//! broken by pool order only, so the selection is fully deterministic.
//!
//! Both quantities are evaluated with integer arithmetic scaled by `T`, so the
//! sign tests never suffer from floating-point rounding.

pub mod feasibility;

use tracing::{debug, error, trace, warn};

use crate::task::{Attributes, Parameters, TaskState, Time};

/// Tolerance for the lag cross-check between the two formulations.
pub const LAG_TOLERANCE: f64 = 1e-4;

// ── Scheduler trait ───────────────────────────────────────────────────────────

/// A per-quantum selection policy.
pub trait Scheduler: Send + Sync {
    /// Short name used in logs and status lines.
    fn name(&self) -> &'static str;

    /// Pick at most `m` indices into `states` to run in the quantum starting
    /// at `t`.  Indices are distinct and in order of selection.
    fn select(&self, t: Time, m: usize, states: &[TaskState]) -> Vec<usize>;
}

// ── Lag / symbol ──────────────────────────────────────────────────────────────

/// `lag(t) · T` as an exact integer.
fn lag_scaled(t: Time, params: &Parameters, ct: Time, releases: Time) -> i128 {
    let (t, c, period) = (t as i128, params.c as i128, params.t as i128);
    t * c - period * (releases as i128 * c - ct as i128)
}

/// `((t+1)·U − ⌊t·U⌋ − 1) · T` as an exact integer.
fn symbol_scaled(t: Time, params: &Parameters) -> i128 {
    let (t, c, period) = (t as i128, params.c as i128, params.t as i128);
    (t + 1) * c - period * (t * c).div_euclid(period) - period
}

/// Time-relative lag at global time `t`.
pub fn lag(t: Time, params: &Parameters, attrs: &Attributes) -> f64 {
    if params.t == 0 {
        return 0.0;
    }
    lag_scaled(t, params, attrs.ct, attrs.releases) as f64 / params.t as f64
}

/// Deadline-relative lag: measured from the start of the current period
/// (`t' = D − Dt`, one release).
pub fn lag_in_period(params: &Parameters, attrs: &Attributes) -> f64 {
    lag(
        params.d - attrs.dt,
        params,
        &Attributes {
            releases: 1,
            ..*attrs
        },
    )
}

/// PFair symbol of slot `t`: `-1`, `0` or `+1`.
pub fn symbol(t: Time, params: &Parameters) -> i32 {
    if params.t == 0 {
        return -1;
    }
    symbol_scaled(t, params).signum() as i32
}

/// Deadline-relative symbol, evaluated at `t' = D − Dt`.
pub fn symbol_in_period(params: &Parameters, attrs: &Attributes) -> i32 {
    symbol(params.d - attrs.dt, params)
}

// ── Classification ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Behind its fluid schedule at a boundary slot – must run.
    Urgent,
    /// Ahead of its fluid schedule – must not run.
    Tnegru,
    Contending,
}

/// Classify one task at probe time `t`.
pub fn classify(t: Time, state: &TaskState) -> Class {
    let params = &state.params;
    if params.t == 0 {
        return Class::Tnegru;
    }
    let lag = lag_scaled(t, params, state.attrs.ct, state.attrs.releases).signum();
    let symbol = symbol_scaled(t, params).signum();

    if lag > 0 && symbol >= 0 {
        Class::Urgent
    } else if lag < 0 && symbol <= 0 {
        Class::Tnegru
    } else {
        Class::Contending
    }
}

/// Compare the time-relative and deadline-relative formulations.
///
/// They coincide for implicit-deadline, zero-phase tasks observed at their
/// own elapsed time; other tasks are skipped.  Returns `false` on mismatch.
pub fn formulations_agree(t: Time, state: &TaskState) -> bool {
    let (params, attrs) = (&state.params, &state.attrs);
    if params.d != params.t || params.o != 0 || params.t == 0 {
        return true;
    }
    let lag_abs = lag(t, params, attrs);
    let lag_rel = lag_in_period(params, attrs);
    let sym_abs = symbol(t, params);
    let sym_rel = symbol_in_period(params, attrs);

    let agree = (lag_abs - lag_rel).abs() < LAG_TOLERANCE && sym_abs == sym_rel;
    if !agree {
        error!(
            task = %state.id,
            t,
            lag_abs,
            lag_rel,
            sym_abs,
            sym_rel,
            "lag/symbol formulations disagree"
        );
    }
    agree
}

// ── PFair ─────────────────────────────────────────────────────────────────────

/// Proportional Fair scheduler.  Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct PFair;

impl Scheduler for PFair {
    fn name(&self) -> &'static str {
        "pfair"
    }

    fn select(&self, t: Time, m: usize, states: &[TaskState]) -> Vec<usize> {
        let mut selected: Vec<usize> = Vec::with_capacity(m);
        let mut contending: Vec<usize> = Vec::new();

        for (i, state) in states.iter().enumerate() {
            let agree = formulations_agree(t, state);
            debug_assert!(agree, "lag/symbol cross-check failed for {}", state.id);

            let class = classify(t, state);
            trace!(task = %state.id, t, ?class, "classified");
            match class {
                Class::Urgent => selected.push(i),
                Class::Tnegru => {}
                Class::Contending => contending.push(i),
            }
        }

        if selected.len() > m {
            warn!(
                urgent = selected.len(),
                processors = m,
                "more urgent tasks than processors, dropping the tail"
            );
            selected.truncate(m);
        }

        // Every task with U > 0 reaches symbol ≥ 0 within one period
        let horizon = contending
            .iter()
            .map(|&i| states[i].params.t)
            .max()
            .unwrap_or(0);
        let mut probe = t;

        while selected.len() < m && !contending.is_empty() && probe <= t + horizon {
            contending.retain(|&i| {
                if selected.len() < m && symbol(probe, &states[i].params) >= 0 {
                    selected.push(i);
                    false
                } else {
                    true
                }
            });
            probe += 1;
        }

        debug!(t, m, selected = ?selected, "pfair selection");
        selected
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
