/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Worker-per-processor quantum stepping.
//!
//! Same pool semantics as [`TaskSystem::step`], but each selected task is
//! moved, together with its processor, into its own worker on the tokio
//! runtime.  A worker performs the task's state transition and then waits on
//! the shared [`Clock`](crate::clock::Clock) for the end of the quantum.
//!
//! ```text
//!  orchestrator           worker k (one per selected task)
//!  ────────────           ────────────────────────────────
//!  validate
//!  spawn workers  ──────► dispatch(Some(p), dt)
//!  step idle tasks        synchronize(t + dt) ┐
//!  clock.increment(dt) ─────────────────────► ┘ released
//!  join all workers ◄──── return (slot, task, outcome)
//!  reclaim processors
//! ```
//!
//! Every worker is joined before the method returns, on success and on
//! failure alike, so no task or processor outlives its quantum inside a
//! worker.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use super::TaskSystem;
use crate::error::{SelectionFault, SimError, TaskFault};
use crate::task::{Task, TaskId, TaskState, TaskStatus, Time};

/// What a worker hands back when it joins.
type WorkerResult = (usize, Task, Result<TaskStatus, TaskFault>);

impl TaskSystem {
    /// Concurrent counterpart of [`step`](Self::step).
    ///
    /// # Errors
    /// As [`step`](Self::step), plus [`SimError::WorkerFailed`] if a worker
    /// panicked (its task is lost; the system must be rebuilt).
    pub async fn step_concurrent(
        &mut self,
        selected: &[usize],
        proportion: Time,
    ) -> Result<Vec<TaskState>, SimError> {
        if selected.is_empty() {
            return Err(SelectionFault::Empty.into());
        }
        let dt = self.validate(selected, proportion)?;
        let end = self.t + dt;

        let mut workers: JoinSet<WorkerResult> = JoinSet::new();
        for (slot, mut task) in self.take_selected(selected).into_iter().enumerate() {
            let processor = self.processors.take();
            debug_assert!(processor.is_some(), "selection validated against free processors");
            let clock = Arc::clone(&self.clock);
            workers.spawn(async move {
                let outcome = task.dispatch(processor, dt);
                clock.synchronize(end).await;
                (slot, task, outcome)
            });
        }

        // Selected tasks must lead the dispatched pool, so the idle ones are
        // set aside until every worker has joined
        let idle_outcome = self.dispatch_idle(dt);
        let mut idle_pool = std::mem::take(&mut self.dispatched);

        // Release the barrier, then join every worker
        self.clock.increment(dt);
        let mut joined = Vec::with_capacity(workers.len());
        let mut worker_failure = None;
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(done) => joined.push(done),
                Err(e) => worker_failure = Some(SimError::WorkerFailed(e.to_string())),
            }
        }
        joined.sort_by_key(|(slot, _, _)| *slot);

        let mut task_failure: Option<(TaskId, TaskFault)> = None;
        for (slot, task, outcome) in joined {
            debug!(slot, task = %task.id(), processor = ?task.processor_id(), ?outcome, "worker joined");
            if let Err(fault) = outcome {
                task_failure.get_or_insert((task.id(), fault));
            }
            self.dispatched.push(task);
        }
        self.dispatched.append(&mut idle_pool);

        if let Some(err) = worker_failure {
            return Err(err);
        }
        if let Some((id, fault)) = task_failure {
            return Err(self.fatal(id, fault));
        }
        idle_outcome?;

        // The clock has already moved; finish_quantum must not move it again
        self.t += dt;
        self.reclaim();
        Ok(self.ready_state())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
