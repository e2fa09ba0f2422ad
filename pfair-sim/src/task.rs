/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Periodic task model for the PFair simulator.
//!
//! Three types model one task:
//!
//! ```text
//! Parameters (C, T, D, O)  ──Task::new──►  Task  ──state()──►  TaskState
//!   immutable input                        mutable timing        read-only snapshot
//!                                          state machine         for schedulers / renderers
//! ```
//!
//! # State machine
//! ```text
//!            dispatch(Some(p)), Ct > 0
//!   Idle ─────────────────────────────► Running
//!    ▲  ◄───────────────────────────────  │
//!    │       dispatch(None) (preempted)   │ dispatch(Some(p)), Ct == 0
//!    │                                    ▼
//!    └──────── period rollover ─────── Completed
//! ```
//!
//! # Ownership model
//! A `Task` is owned by exactly one pool of its
//! [`TaskSystem`](crate::system::TaskSystem) at a time and never refers back
//! to it.  While dispatched it owns its [`Processor`] by value; the system
//! takes it back with [`Task::release_processor`].

use std::fmt;

use tracing::trace;

use crate::error::{SimError, TaskFault};
use crate::processor::{Processor, ProcessorId};

/// Simulated time, in the caller's unit.
///
/// Signed so that laxity can be observed going negative before the fault is
/// raised.
pub type Time = i64;

// ── Identity ──────────────────────────────────────────────────────────────────

/// Stable task identity, allocated monotonically by the owning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// Static timing parameters of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    /// Execution cost per period (C).
    pub c: Time,

    /// Period (T).
    pub t: Time,

    /// Relative deadline (D).  Equals `t` unless set explicitly.
    pub d: Time,

    /// Phase offset of the first release (O).
    pub o: Time,
}

impl Parameters {
    /// Implicit-deadline task with zero phase.
    pub fn new(c: Time, t: Time) -> Self {
        Self { c, t, d: t, o: 0 }
    }

    /// Returns the parameters with relative deadline `d`.  A value of `0`
    /// keeps the implicit deadline `D = T`.
    pub fn with_deadline(self, d: Time) -> Self {
        Self {
            d: if d == 0 { self.t } else { d },
            ..self
        }
    }

    /// Returns the parameters with phase offset `o`.
    pub fn with_offset(self, o: Time) -> Self {
        Self { o, ..self }
    }

    /// Utilisation `C / T`.  Returns `0.0` for a zero period.
    pub fn u(&self) -> f64 {
        if self.t == 0 {
            0.0
        } else {
            self.c as f64 / self.t as f64
        }
    }

    /// Attributes at the start of a period.
    pub fn initial_attributes(&self) -> Attributes {
        Attributes {
            ct: self.c,
            dt: self.d,
            lt: self.d - self.c,
            rt: self.c,
            releases: 1,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.t <= 0 {
            return Err("period must be positive");
        }
        if self.c < 0 {
            return Err("cost must not be negative");
        }
        if self.d <= 0 {
            return Err("deadline must be positive");
        }
        if self.o < 0 {
            return Err("offset must not be negative");
        }
        if self.c > self.t {
            return Err("utilization C/T exceeds 1");
        }
        if self.c > self.d {
            return Err("cost exceeds the relative deadline");
        }
        Ok(())
    }
}

// ── Attributes ────────────────────────────────────────────────────────────────

/// Time-varying accounting of the current period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Remaining cost this period (Ct).
    pub ct: Time,

    /// Remaining time to the deadline (Dt).
    pub dt: Time,

    /// Laxity `Dt − Ct` (Lt).  Never negative after a successful step.
    pub lt: Time,

    /// Consumed accounting `D − Lt` (Rt).
    pub rt: Time,

    /// Number of periods started so far, `1` at simulation start.
    pub releases: Time,
}

// ── Status ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    /// All cost of the current period has been served.
    Completed,
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Read-only `(id, Parameters, Attributes)` view of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    pub id: TaskId,
    pub params: Parameters,
    pub attrs: Attributes,
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A periodic task instance and its timing state machine.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    params: Parameters,
    attrs: Attributes,
    status: TaskStatus,
    /// Time elapsed since simulation start.  Not reset at period rollover.
    elapsed: Time,
    processor: Option<Processor>,
}

impl Task {
    /// Build a task from `params`.
    ///
    /// # Errors
    /// [`SimError::InvalidTask`] when the period or deadline is not positive,
    /// the cost or offset is negative, or `C` exceeds `T` or `D`.
    pub fn new(id: TaskId, params: Parameters) -> Result<Self, SimError> {
        params.validate().map_err(|reason| SimError::InvalidTask {
            c: params.c,
            t: params.t,
            d: params.d,
            o: params.o,
            reason,
        })?;

        Ok(Self {
            id,
            params,
            attrs: params.initial_attributes(),
            status: TaskStatus::Idle,
            elapsed: 0,
            processor: None,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn elapsed(&self) -> Time {
        self.elapsed
    }

    pub fn utilization(&self) -> f64 {
        self.params.u()
    }

    /// Id of the bound processor, if dispatched on one this quantum.
    pub fn processor_id(&self) -> Option<ProcessorId> {
        self.processor.as_ref().map(Processor::id)
    }

    pub fn state(&self) -> TaskState {
        TaskState {
            id: self.id,
            params: self.params,
            attrs: self.attrs,
        }
    }

    /// `true` while the task still has cost to serve this period.
    pub fn ready(&self) -> bool {
        matches!(self.status, TaskStatus::Idle | TaskStatus::Running)
    }

    /// Restore the per-period attributes from the parameters.
    ///
    /// With `start == true` the elapsed time and release counter are also
    /// rewound (simulation restart); otherwise only the period fields are
    /// refreshed (period rollover).
    pub fn reset(&mut self, start: bool) {
        let releases = if start { 1 } else { self.attrs.releases };
        if start {
            self.elapsed = 0;
        }
        self.attrs = Attributes {
            releases,
            ..self.params.initial_attributes()
        };
        self.status = TaskStatus::Idle;
    }

    /// Advance the task by `delta`, optionally running on `processor`.
    ///
    /// This is the only mutator of the timing state.  Every task managed by a
    /// system receives exactly one call per quantum.
    ///
    /// # Errors
    /// * [`TaskFault::Overrun`] – a processor was supplied but the task is
    ///   already completed this period.  The processor stays bound.
    /// * [`TaskFault::DeadlineMiss`] – laxity is negative after the step.
    pub fn dispatch(
        &mut self,
        processor: Option<Processor>,
        delta: Time,
    ) -> Result<TaskStatus, TaskFault> {
        match processor {
            None => {
                // Preempted: not selected this quantum
                if self.status == TaskStatus::Running {
                    self.status = TaskStatus::Idle;
                }
            }
            Some(p) => {
                debug_assert!(
                    self.processor.is_none(),
                    "task {} already holds a processor",
                    self.id
                );
                self.processor = Some(p);
                if !self.ready() {
                    return Err(TaskFault::Overrun);
                }
                self.attrs.ct -= delta;
                self.status = if self.attrs.ct > 0 {
                    TaskStatus::Running
                } else {
                    TaskStatus::Completed
                };
            }
        }

        self.elapsed += delta;
        self.attrs.dt -= delta;
        self.attrs.lt = self.attrs.dt - self.attrs.ct;
        self.attrs.rt = self.params.d - self.attrs.lt;

        if self.attrs.lt < 0 {
            return Err(TaskFault::DeadlineMiss {
                laxity: self.attrs.lt,
                remaining: self.attrs.ct,
                to_deadline: self.attrs.dt,
            });
        }

        let next_release = self.params.o + self.attrs.releases * self.params.t;
        if self.elapsed >= next_release {
            self.attrs.releases += 1;
            self.reset(false);
            trace!(task = %self.id, releases = self.attrs.releases, "new period");
        }

        Ok(self.status)
    }

    /// Overwrite the per-period accounting.
    #[cfg(test)]
    pub(crate) fn set_attributes(&mut self, attrs: Attributes) {
        self.attrs = attrs;
    }

    /// Detach the bound processor so it can return to the pool.
    pub fn release_processor(&mut self) -> Option<Processor> {
        self.processor.take()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessorPool;

    fn task(c: Time, t: Time) -> Task {
        Task::new(TaskId(0), Parameters::new(c, t)).unwrap()
    }

    // ── Parameters ────────────────────────────────────────────────────────────

    #[test]
    fn deadline_defaults_to_period() {
        let p = Parameters::new(2, 5);
        assert_eq!(p.d, 5);
        assert_eq!(p.with_deadline(0).d, 5);
        assert_eq!(p.with_deadline(4).d, 4);
    }

    #[test]
    fn utilization_is_cost_over_period() {
        assert!((Parameters::new(1, 4).u() - 0.25).abs() < 1e-12);
        assert_eq!(Parameters::new(1, 0).u(), 0.0);
    }

    #[test]
    fn initial_attributes_follow_parameters() {
        let a = Parameters::new(2, 5).with_deadline(4).initial_attributes();
        assert_eq!(
            a,
            Attributes {
                ct: 2,
                dt: 4,
                lt: 2,
                rt: 2,
                releases: 1
            }
        );
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn utilization_above_one_is_rejected() {
        let err = Task::new(TaskId(0), Parameters::new(3, 2)).unwrap_err();
        assert!(matches!(err, SimError::InvalidTask { .. }), "{err}");
    }

    #[test]
    fn zero_period_is_rejected() {
        let err = Task::new(TaskId(0), Parameters::new(1, 0)).unwrap_err();
        assert!(matches!(err, SimError::InvalidTask { .. }));
    }

    #[test]
    fn cost_above_deadline_is_rejected() {
        let params = Parameters::new(3, 6).with_deadline(2);
        assert!(Task::new(TaskId(0), params).is_err());
    }

    #[test]
    fn full_utilization_task_is_accepted() {
        let t = task(2, 2);
        assert_eq!(t.utilization(), 1.0);
        assert_eq!(t.attrs().lt, 0);
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[test]
    fn selected_step_decrements_cost_and_runs() {
        let mut pool = ProcessorPool::new(1);
        let mut t = task(2, 4);
        let status = t.dispatch(pool.take(), 1).unwrap();
        assert_eq!(status, TaskStatus::Running);
        assert_eq!(t.attrs().ct, 1);
        assert_eq!(t.attrs().dt, 3);
        assert_eq!(t.attrs().lt, 2);
        assert_eq!(t.attrs().rt, 2);
        assert_eq!(t.elapsed(), 1);
        assert_eq!(t.processor_id(), Some(ProcessorId(0)));
    }

    #[test]
    fn serving_last_unit_completes() {
        let mut pool = ProcessorPool::new(1);
        let mut t = task(1, 3);
        assert_eq!(t.dispatch(pool.take(), 1).unwrap(), TaskStatus::Completed);
        assert!(!t.ready());
    }

    #[test]
    fn unselected_running_task_is_preempted() {
        let mut pool = ProcessorPool::new(1);
        let mut t = task(2, 5);
        t.dispatch(pool.take(), 1).unwrap();
        pool.give_back(t.release_processor().unwrap());

        assert_eq!(t.dispatch(None, 1).unwrap(), TaskStatus::Idle);
        assert_eq!(t.attrs().ct, 1);
        assert_eq!(t.attrs().dt, 3);
    }

    #[test]
    fn completed_task_selected_again_overruns() {
        let mut pool = ProcessorPool::new(1);
        let mut t = task(1, 4);
        t.dispatch(pool.take(), 1).unwrap();
        pool.give_back(t.release_processor().unwrap());

        let err = t.dispatch(pool.take(), 1).unwrap_err();
        assert_eq!(err, TaskFault::Overrun);
        assert!(
            t.processor_id().is_some(),
            "processor stays bound until reclaimed"
        );
    }

    #[test]
    fn idling_past_laxity_misses_deadline() {
        let mut t = task(2, 3);
        t.dispatch(None, 1).unwrap(); // Lt = 2 - 2 = 0
        let err = t.dispatch(None, 1).unwrap_err();
        assert_eq!(
            err,
            TaskFault::DeadlineMiss {
                laxity: -1,
                remaining: 2,
                to_deadline: 1
            }
        );
    }

    #[test]
    fn period_rollover_refreshes_attributes_and_counts_release() {
        let mut pool = ProcessorPool::new(1);
        let mut t = task(1, 2);
        t.dispatch(pool.take(), 1).unwrap();
        pool.give_back(t.release_processor().unwrap());
        assert_eq!(t.status(), TaskStatus::Completed);

        let status = t.dispatch(None, 1).unwrap();
        assert_eq!(status, TaskStatus::Idle, "new period makes the task ready");
        assert_eq!(t.attrs().ct, 1);
        assert_eq!(t.attrs().dt, 2);
        assert_eq!(t.attrs().releases, 2);
        assert_eq!(t.elapsed(), 2, "elapsed time survives rollover");
    }

    #[test]
    fn rollover_honours_phase_offset() {
        let params = Parameters::new(1, 4).with_deadline(6).with_offset(2);
        let mut t = Task::new(TaskId(1), params).unwrap();
        // Next release boundary is O + 1·T = 6
        for _ in 0..5 {
            t.dispatch(None, 1).unwrap();
        }
        assert_eq!(t.attrs().releases, 1);
        assert_eq!(t.attrs().dt, 1);
        t.dispatch(None, 1).unwrap_err(); // Dt = 0 with Ct = 1
    }

    // ── reset ─────────────────────────────────────────────────────────────────

    #[test]
    fn reset_start_rewinds_elapsed_and_releases() {
        let mut t = task(1, 2);
        t.dispatch(None, 1).unwrap();
        t.reset(true);
        assert_eq!(t.elapsed(), 0);
        assert_eq!(t.attrs(), &t.params().initial_attributes());
        assert_eq!(t.status(), TaskStatus::Idle);
    }

    #[test]
    fn reset_without_start_keeps_release_count() {
        let mut t = task(1, 2);
        t.dispatch(None, 1).unwrap();
        t.dispatch(None, 1).unwrap_err();
        t.reset(false);
        assert_eq!(t.elapsed(), 2);
        assert_eq!(t.attrs().releases, 1);
        assert_eq!(t.attrs().ct, 1);
    }

    #[test]
    fn task_id_display() {
        assert_eq!(TaskId(12).to_string(), "T12");
    }
}
