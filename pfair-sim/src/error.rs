/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the PFair simulator.
//!
//! Three layers of failure are modelled:
//!
//! * [`TaskFault`] – a single task broke its timing contract inside
//!   [`Task::dispatch`](crate::task::Task::dispatch).
//! * [`SelectionFault`] – why a selection passed to
//!   [`TaskSystem::step`](crate::system::TaskSystem::step) was rejected
//!   (carries the offending index or count).
//! * [`SimError`] – top-level failure returned by the system and the driver.
//!
//! Every variant of [`SimError`] is fatal for the current run.  Nothing in the
//! crate retries or clamps them; the caller stops, reports, and may call
//! [`TaskSystem::reset`](crate::system::TaskSystem::reset) to start over.

use thiserror::Error;

use crate::task::{TaskId, Time};

// ── Per-task faults ───────────────────────────────────────────────────────────

/// Timing contract violation raised by a single task step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFault {
    /// The task was handed a processor while already `Completed` this period.
    #[error("task selected while already completed this period")]
    Overrun,

    /// Laxity went negative: the remaining cost no longer fits before the
    /// deadline.
    #[error("deadline miss: laxity {laxity} < 0 (remaining cost {remaining}, time to deadline {to_deadline})")]
    DeadlineMiss {
        laxity: Time,
        remaining: Time,
        to_deadline: Time,
    },
}

// ── Selection validation ──────────────────────────────────────────────────────

/// Detailed reason why a selection was rejected before any mutation.
///
/// Carried inside [`SimError::Selection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionFault {
    /// `step` was called with no selected index.
    Empty,

    /// An index does not address a task in the ready pool.
    OutOfRange { index: usize, ready: usize },

    /// The same index appears more than once.
    Duplicate { index: usize },

    /// More tasks were selected than there are free processors.
    TooMany { selected: usize, available: usize },

    /// The quantum multiplier must be at least one, and the stretched quantum
    /// must still divide every admitted task's `C`, `D` and `T`.
    InvalidProportion { proportion: Time },
}

impl std::fmt::Display for SelectionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionFault::Empty => write!(f, "no task selected"),

            SelectionFault::OutOfRange { index, ready } => write!(
                f,
                "index {} is outside the ready pool of {} task(s)",
                index, ready
            ),

            SelectionFault::Duplicate { index } => {
                write!(f, "index {} selected more than once", index)
            }

            SelectionFault::TooMany {
                selected,
                available,
            } => write!(
                f,
                "{} task(s) selected but only {} processor(s) available",
                selected, available
            ),

            SelectionFault::InvalidProportion { proportion } => {
                write!(
                    f,
                    "quantum proportion {} must be >= 1 and keep the quantum dividing every C, D and T",
                    proportion
                )
            }
        }
    }
}

// ── Top-level errors ──────────────────────────────────────────────────────────

/// Top-level error type returned by [`TaskSystem`](crate::system::TaskSystem)
/// and [`Simulation`](crate::simulation::Simulation).
#[derive(Debug, Error)]
pub enum SimError {
    /// Task parameters are malformed (zero period, cost above the deadline or
    /// the period, ...).
    #[error("invalid task parameters C={c} T={t} D={d} O={o}: {reason}")]
    InvalidTask {
        c: Time,
        t: Time,
        d: Time,
        o: Time,
        reason: &'static str,
    },

    /// Admitting the task would push the cumulative utilisation above the
    /// processor count.
    #[error("admission rejected: utilization {current:.3} + {added:.3} exceeds {processors} processor(s)")]
    Admission {
        current: f64,
        added: f64,
        processors: usize,
    },

    /// A task was offered after the first quantum.  Tasks can only join a
    /// system at time zero, before any step or after a reset.
    #[error("admission closed at t={time}: tasks can only be added before the first quantum")]
    AdmissionClosed { time: Time },

    /// A task was dispatched with a processor while already completed.
    #[error("task {task} overrun at t={time}: selected while already completed this period")]
    Overrun { task: TaskId, time: Time },

    /// A task's laxity went negative after a step.
    #[error("task {task} missed its deadline at t={time}: {fault}")]
    DeadlineMiss {
        task: TaskId,
        time: Time,
        fault: TaskFault,
    },

    /// The selection passed to `step` was malformed.
    #[error("invalid selection: {0}")]
    Selection(SelectionFault),

    /// The hyperperiod no longer fits the time type.
    #[error("hyperperiod overflow computing lcm({a}, {b})")]
    HyperperiodOverflow { a: Time, b: Time },

    /// A concurrent worker panicked or was cancelled before it could hand
    /// its task back.
    #[error("quantum worker failed: {0}")]
    WorkerFailed(String),
}

impl SimError {
    /// Attach task identity and the simulated time to a [`TaskFault`].
    pub fn from_fault(task: TaskId, time: Time, fault: TaskFault) -> Self {
        match fault {
            TaskFault::Overrun => SimError::Overrun { task, time },
            fault @ TaskFault::DeadlineMiss { .. } => SimError::DeadlineMiss { task, time, fault },
        }
    }
}

impl From<SelectionFault> for SimError {
    fn from(fault: SelectionFault) -> Self {
        SimError::Selection(fault)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fault_maps_overrun() {
        let err = SimError::from_fault(TaskId(3), 7, TaskFault::Overrun);
        assert!(matches!(
            err,
            SimError::Overrun {
                task: TaskId(3),
                time: 7
            }
        ));
    }

    #[test]
    fn from_fault_keeps_deadline_miss_details() {
        let fault = TaskFault::DeadlineMiss {
            laxity: -1,
            remaining: 2,
            to_deadline: 1,
        };
        let err = SimError::from_fault(TaskId(0), 4, fault.clone());
        match err {
            SimError::DeadlineMiss { task, time, fault: f } => {
                assert_eq!(task, TaskId(0));
                assert_eq!(time, 4);
                assert_eq!(f, fault);
            }
            other => panic!("expected DeadlineMiss, got {other:?}"),
        }
    }

    #[test]
    fn selection_fault_messages_carry_values() {
        let msg = SimError::from(SelectionFault::TooMany {
            selected: 2,
            available: 1,
        })
        .to_string();
        assert!(msg.contains("2 task(s) selected"), "{msg}");
        assert!(msg.contains("1 processor(s)"), "{msg}");

        let msg = SelectionFault::OutOfRange { index: 5, ready: 2 }.to_string();
        assert_eq!(msg, "index 5 is outside the ready pool of 2 task(s)");
    }
}
