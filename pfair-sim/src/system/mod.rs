/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Multiprocessor task system: admission, quantum dispatch and reclamation.
//!
//! [`TaskSystem`] owns every [`Task`] and
//! [`Processor`](crate::processor::Processor) of one simulation.
//! Each task lives in exactly one of three pools:
//!
//! ```text
//!             step/idle                     reclaim
//!   ready ──────────────► dispatched ───────────────► ready      (ready())
//!   completed ──────────►            ───────────────► completed  (otherwise)
//! ```
//!
//! The dispatched pool is only populated *during* a quantum; between calls it
//! is empty unless a fatal error aborted the quantum, in which case
//! [`TaskSystem::reset`] restores a consistent system.
//!
//! # Example
//! ```rust
//! use pfair_sim::scheduler::{PFair, Scheduler};
//! use pfair_sim::system::TaskSystem;
//! use pfair_sim::task::Parameters;
//!
//! let mut system = TaskSystem::new(1);
//! system.add_task(Parameters::new(1, 2)).unwrap();
//! system.add_task(Parameters::new(1, 2)).unwrap();
//!
//! let picked = PFair.select(system.time(), system.processors(), &system.ready_state());
//! system.step(&picked, 1).unwrap();
//! assert_eq!(system.time(), 1);
//! ```

pub mod concurrent;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::{SelectionFault, SimError, TaskFault};
use crate::hyperperiod::{HyperperiodError, Timebase};
use crate::processor::{ProcessorId, ProcessorPool};
use crate::scheduler::feasibility::Utilization;
use crate::task::{Parameters, Task, TaskId, TaskState, TaskStatus, Time};

// ── Summary ───────────────────────────────────────────────────────────────────

/// Descriptor of a task system for status lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSummary {
    pub utilization: f64,
    pub tasks: usize,
    pub processors: usize,
    pub hyperperiod: Time,
    pub quantum: Time,
}

impl fmt::Display for SystemSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "U={:.2} n={} m={} H={} dt={}",
            self.utilization, self.tasks, self.processors, self.hyperperiod, self.quantum
        )
    }
}

// ── TaskSystem ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct TaskSystem {
    utilization: Utilization,
    timebase: Timebase,
    /// Global elapsed time.
    t: Time,
    next_id: u64,

    ready: Vec<Task>,
    dispatched: Vec<Task>,
    completed: Vec<Task>,
    processors: ProcessorPool,

    /// Processor → task bindings of the most recent quantum.
    last_assignments: Vec<(ProcessorId, TaskId)>,
    clock: Arc<Clock>,
}

impl TaskSystem {
    /// Empty system with `m` processors.
    pub fn new(m: usize) -> Self {
        Self {
            utilization: Utilization::ZERO,
            timebase: Timebase::default(),
            t: 0,
            next_id: 0,
            ready: Vec::new(),
            dispatched: Vec::new(),
            completed: Vec::new(),
            processors: ProcessorPool::new(m),
            last_assignments: Vec::new(),
            clock: Arc::new(Clock::new()),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn processors(&self) -> usize {
        self.processors.total()
    }

    /// Number of admitted tasks.
    pub fn task_count(&self) -> usize {
        self.ready.len() + self.dispatched.len() + self.completed.len()
    }

    pub fn utilization(&self) -> f64 {
        self.utilization.as_f64()
    }

    /// Quantum size `dt` (0 while empty).
    pub fn quantum(&self) -> Time {
        self.timebase.quantum
    }

    pub fn timebase(&self) -> Timebase {
        self.timebase
    }

    /// Hyperperiod `H` (0 while empty).
    pub fn hyperperiod(&self) -> Time {
        self.timebase.hyperperiod
    }

    /// Global elapsed time.
    pub fn time(&self) -> Time {
        self.t
    }

    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    pub fn available_processors(&self) -> usize {
        self.processors.available()
    }

    pub fn last_assignments(&self) -> &[(ProcessorId, TaskId)] {
        &self.last_assignments
    }

    pub fn summary(&self) -> SystemSummary {
        SystemSummary {
            utilization: self.utilization(),
            tasks: self.task_count(),
            processors: self.processors(),
            hyperperiod: self.hyperperiod(),
            quantum: self.quantum(),
        }
    }

    /// Ready pool as `(id, Parameters, Attributes)` in pool order.
    pub fn ready_state(&self) -> Vec<TaskState> {
        self.ready.iter().map(Task::state).collect()
    }

    /// Completed pool as `(id, Parameters, Attributes)` in pool order.
    pub fn completed_state(&self) -> Vec<TaskState> {
        self.completed.iter().map(Task::state).collect()
    }

    // ── Admission ─────────────────────────────────────────────────────────────

    /// Admit a task.
    ///
    /// Admission is only open while the system is at its initial state:
    /// before the first quantum, or after [`reset`](Self::reset).
    ///
    /// Returns `Ok(None)` for a zero-utilisation task, which is ignored.
    ///
    /// # Errors
    /// * [`SimError::AdmissionClosed`] – a quantum has already run.
    /// * [`SimError::InvalidTask`] – malformed parameters.
    /// * [`SimError::Admission`] – `Σ U` would exceed `m`.
    /// * [`SimError::HyperperiodOverflow`] – the new hyperperiod overflows.
    ///
    /// On error the system is unchanged.
    pub fn add_task(&mut self, params: Parameters) -> Result<Option<TaskId>, SimError> {
        // Lag and symbol are evaluated at global time, so a late task would
        // start out of phase with every other one
        if self.t != 0 || !self.dispatched.is_empty() || !self.completed.is_empty() {
            warn!(t = self.t, c = params.c, t_period = params.t, "admission closed after the first quantum");
            return Err(SimError::AdmissionClosed { time: self.t });
        }

        let id = TaskId(self.next_id);
        let task = Task::new(id, params)?;

        let added = Utilization::of(task.params());
        if added.is_zero() {
            debug!(c = params.c, t = params.t, "ignoring zero-utilization task");
            return Ok(None);
        }

        let m = self.processors();
        let rejected = || SimError::Admission {
            current: self.utilization.as_f64(),
            added: added.as_f64(),
            processors: m,
        };
        let total = self
            .utilization
            .checked_add(added)
            .ok_or_else(rejected)?;
        if !total.fits(m) {
            warn!(
                task = %id,
                current = %self.utilization,
                added = %added,
                processors = m,
                "admission rejected"
            );
            return Err(rejected());
        }

        let timebase = self
            .timebase
            .admit(task.params())
            .map_err(|HyperperiodError::Overflow { a, b }| SimError::HyperperiodOverflow { a, b })?;

        self.utilization = total;
        self.timebase = timebase;
        self.next_id += 1;
        self.ready.push(task);

        info!(
            task = %id,
            c = params.c,
            t = params.t,
            d = params.d,
            o = params.o,
            utilization = %self.utilization,
            quantum = self.timebase.quantum,
            hyperperiod = self.timebase.hyperperiod,
            "task admitted"
        );
        Ok(Some(id))
    }

    // ── Reset ─────────────────────────────────────────────────────────────────

    /// Return every task to the ready pool in its initial state and rewind
    /// time to zero.
    pub fn reset(&mut self) {
        let mut ready = Vec::with_capacity(self.task_count());
        for mut task in self.dispatched.drain(..) {
            if let Some(p) = task.release_processor() {
                self.processors.give_back(p);
            }
            ready.push(task);
        }
        ready.append(&mut self.ready);
        ready.append(&mut self.completed);

        for task in &mut ready {
            task.reset(true);
        }
        self.ready = ready;
        self.t = 0;
        self.clock.reset();
        self.last_assignments.clear();

        info!(tasks = self.ready.len(), "task system reset");
    }

    // ── Quantum dispatch ──────────────────────────────────────────────────────

    /// Run one quantum with the tasks at `selected` (indices into the ready
    /// pool) on processors and every other task idle.
    ///
    /// The quantum lasts `dt × proportion`.  Returns the new ready snapshot.
    ///
    /// # Errors
    /// * [`SimError::Selection`] – empty, duplicate, out-of-range or too many
    ///   indices, or a `proportion` whose quantum does not divide every task's
    ///   `C`, `D` and `T`.  Nothing is mutated.
    /// * [`SimError::Overrun`] / [`SimError::DeadlineMiss`] – fatal; call
    ///   [`reset`](Self::reset) before reusing the system.
    pub fn step(&mut self, selected: &[usize], proportion: Time) -> Result<Vec<TaskState>, SimError> {
        if selected.is_empty() {
            return Err(SelectionFault::Empty.into());
        }
        let dt = self.validate(selected, proportion)?;

        let mut failure = None;
        for mut task in self.take_selected(selected) {
            if failure.is_none() {
                if let Err(fault) = self.dispatch_selected(&mut task, dt) {
                    failure = Some((task.id(), fault));
                }
            }
            self.dispatched.push(task);
        }
        if let Some((id, fault)) = failure {
            return Err(self.fatal(id, fault));
        }
        self.dispatch_idle(dt)?;
        self.finish_quantum(dt);
        Ok(self.ready_state())
    }

    /// Run one quantum with no task selected.
    ///
    /// Used when the scheduler picks nothing; every task still advances.
    pub fn idle(&mut self, proportion: Time) -> Result<Vec<TaskState>, SimError> {
        let dt = self.validate(&[], proportion)?;
        self.dispatch_idle(dt)?;
        self.finish_quantum(dt);
        Ok(self.ready_state())
    }

    /// Check a selection and return the effective quantum length.
    fn validate(&self, selected: &[usize], proportion: Time) -> Result<Time, SelectionFault> {
        if proportion < 1 {
            return Err(SelectionFault::InvalidProportion { proportion });
        }
        // dt is the gcd of every C, D and T, so a longer quantum must divide it
        let quantum = self.timebase.quantum;
        let dt = quantum.checked_mul(proportion).unwrap_or(Time::MAX);
        if quantum > 0 && quantum % dt != 0 {
            return Err(SelectionFault::InvalidProportion { proportion });
        }
        let available = self.processors.available();
        if selected.len() > available {
            return Err(SelectionFault::TooMany {
                selected: selected.len(),
                available,
            });
        }
        let mut seen = vec![false; self.ready.len()];
        for &index in selected {
            match seen.get_mut(index) {
                None => {
                    return Err(SelectionFault::OutOfRange {
                        index,
                        ready: self.ready.len(),
                    })
                }
                Some(true) => return Err(SelectionFault::Duplicate { index }),
                Some(flag) => *flag = true,
            }
        }
        Ok(dt)
    }

    /// Remove the selected tasks from the ready pool, in caller order.
    ///
    /// `selected` must already be validated.
    fn take_selected(&mut self, selected: &[usize]) -> Vec<Task> {
        let mut slots: Vec<Option<Task>> = self.ready.drain(..).map(Some).collect();
        let picked = selected
            .iter()
            .filter_map(|&i| slots[i].take())
            .collect();
        self.ready = slots.into_iter().flatten().collect();
        picked
    }

    fn dispatch_selected(&mut self, task: &mut Task, dt: Time) -> Result<TaskStatus, TaskFault> {
        let processor = self.processors.take();
        debug_assert!(processor.is_some(), "selection validated against free processors");
        let outcome = task.dispatch(processor, dt);
        if let Some(pid) = task.processor_id() {
            debug!(task = %task.id(), processor = %pid, status = ?task.status(), "dispatched");
        }
        outcome
    }

    /// Step every remaining ready task, then every completed task, without a
    /// processor.
    fn dispatch_idle(&mut self, dt: Time) -> Result<(), SimError> {
        let mut idle: Vec<Task> = self.ready.drain(..).collect();
        idle.append(&mut self.completed);

        let mut failure = None;
        for mut task in idle {
            if failure.is_none() {
                if let Err(fault) = task.dispatch(None, dt) {
                    failure = Some((task.id(), fault));
                }
            }
            self.dispatched.push(task);
        }

        match failure {
            Some((id, fault)) => Err(self.fatal(id, fault)),
            None => Ok(()),
        }
    }

    /// Advance global time and sort the dispatched pool back into the ready
    /// and completed pools, reclaiming processors.
    fn finish_quantum(&mut self, dt: Time) {
        self.t += dt;
        self.clock.increment(dt);
        self.reclaim();
    }

    fn reclaim(&mut self) {
        self.last_assignments.clear();

        for mut task in std::mem::take(&mut self.dispatched) {
            if let Some(p) = task.release_processor() {
                self.last_assignments.push((p.id(), task.id()));
                self.processors.give_back(p);
            }
            if task.ready() {
                self.ready.push(task);
            } else {
                self.completed.push(task);
            }
        }

        debug!(
            t = self.t,
            ready = self.ready.len(),
            completed = self.completed.len(),
            free = ?self.processors.free_ids(),
            "quantum complete"
        );
    }

    fn fatal(&self, task: TaskId, fault: TaskFault) -> SimError {
        let err = SimError::from_fault(task, self.t, fault);
        error!(%task, t = self.t, error = %err, "fatal scheduling fault");
        err
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
