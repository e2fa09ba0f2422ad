/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Run-loop driver.
//!
//! Each iteration snapshots the ready pool, asks the [`Scheduler`] for a
//! selection and advances the [`TaskSystem`] by one quantum, recording which
//! processor ran which task.  The first fatal fault ends the run.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::processor::ProcessorId;
use crate::scheduler::Scheduler;
use crate::system::{SystemSummary, TaskSystem};
use crate::task::{TaskId, Time};

/// How a quantum is stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every task transition runs on the orchestrator.
    #[default]
    Sequential,
    /// Selected tasks run in per-processor workers behind the clock barrier.
    Concurrent,
}

/// Processor bindings of one simulated quantum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantumRecord {
    /// Time at which the quantum started.
    pub time: Time,
    pub assignments: Vec<(ProcessorId, TaskId)>,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub quanta: Vec<QuantumRecord>,
    pub summary: SystemSummary,
}

impl SimulationReport {
    /// Number of quanta in which `task` held a processor.
    pub fn served(&self, task: TaskId) -> usize {
        self.quanta
            .iter()
            .filter(|q| q.assignments.iter().any(|&(_, id)| id == task))
            .count()
    }

    /// Number of quanta in which no processor was busy.
    pub fn idle_quanta(&self) -> usize {
        self.quanta.iter().filter(|q| q.assignments.is_empty()).count()
    }
}

pub struct Simulation {
    system: TaskSystem,
    scheduler: Box<dyn Scheduler>,
    mode: Mode,
    proportion: Time,
}

impl Simulation {
    pub fn new(system: TaskSystem, scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            system,
            scheduler,
            mode: Mode::Sequential,
            proportion: 1,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Quantum multiplier passed to every step.
    pub fn with_proportion(mut self, proportion: Time) -> Self {
        self.proportion = proportion;
        self
    }

    pub fn system(&self) -> &TaskSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut TaskSystem {
        &mut self.system
    }

    pub fn into_system(self) -> TaskSystem {
        self.system
    }

    /// Iterations needed to cover one hyperperiod.
    pub fn hyperperiod_iterations(&self) -> u64 {
        let quanta = self.system.timebase().quanta();
        if quanta <= 0 {
            return 0;
        }
        let proportion = self.proportion.max(1);
        u64::try_from((quanta + proportion - 1) / proportion).unwrap_or(0).max(1)
    }

    /// Advance by a single quantum.
    ///
    /// # Errors
    /// Any fatal [`SimError`] raised by the step.
    pub async fn advance(&mut self) -> Result<QuantumRecord, SimError> {
        let time = self.system.time();
        let states = self.system.ready_state();
        let selected = self
            .scheduler
            .select(time, self.system.processors(), &states);
        debug!(t = time, scheduler = self.scheduler.name(), ?selected, "selection");

        if selected.is_empty() {
            self.system.idle(self.proportion)?;
        } else {
            match self.mode {
                Mode::Sequential => {
                    self.system.step(&selected, self.proportion)?;
                }
                Mode::Concurrent => {
                    self.system
                        .step_concurrent(&selected, self.proportion)
                        .await?;
                }
            }
        }

        Ok(QuantumRecord {
            time,
            assignments: self.system.last_assignments().to_vec(),
        })
    }

    /// Run `iterations` quanta; `0` runs one hyperperiod.
    ///
    /// # Errors
    /// Stops at the first fatal [`SimError`]; the system is left as the
    /// failing quantum found it (see [`TaskSystem::reset`]).
    pub async fn run(&mut self, iterations: u64) -> Result<SimulationReport, SimError> {
        let summary = self.system.summary();
        if self.system.task_count() == 0 {
            warn!("no tasks admitted, nothing to simulate");
            return Ok(SimulationReport {
                quanta: Vec::new(),
                summary,
            });
        }

        let iterations = if iterations == 0 {
            self.hyperperiod_iterations()
        } else {
            iterations
        };
        info!(%summary, iterations, mode = ?self.mode, proportion = self.proportion, "simulation starting");

        let mut quanta = Vec::new();
        for _ in 0..iterations {
            quanta.push(self.advance().await?);
        }

        let report = SimulationReport { quanta, summary };
        info!(
            t = self.system.time(),
            quanta = report.quanta.len(),
            idle = report.idle_quanta(),
            "simulation finished"
        );
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::SelectionFault;
    use crate::scheduler::PFair;
    use crate::task::Parameters;

    fn simulation(m: usize, tasks: &[(Time, Time)]) -> Simulation {
        let mut system = TaskSystem::new(m);
        for &(c, t) in tasks {
            system.add_task(Parameters::new(c, t)).unwrap();
        }
        Simulation::new(system, Box::new(PFair))
    }

    // ── Iteration count ───────────────────────────────────────────────────────

    #[test]
    fn zero_iterations_means_one_hyperperiod() {
        let sim = simulation(2, &[(1, 2), (2, 3), (1, 3), (1, 6)]);
        assert_eq!(sim.hyperperiod_iterations(), 6);

        // dt = 2, H = 8
        let sim = simulation(1, &[(2, 4), (2, 8)]);
        assert_eq!(sim.hyperperiod_iterations(), 4);

        assert_eq!(simulation(1, &[]).hyperperiod_iterations(), 0);
    }

    #[tokio::test]
    async fn empty_system_runs_nothing() {
        let mut sim = simulation(2, &[]);
        let report = sim.run(10).await.unwrap();
        assert!(report.quanta.is_empty());
        assert_eq!(report.summary.tasks, 0);
    }

    // ── Runs ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn two_half_tasks_on_one_processor_alternate() {
        let mut sim = simulation(1, &[(1, 2), (1, 2)]);
        let report = sim.run(0).await.unwrap();

        assert_eq!(report.quanta.len(), 2);
        assert_eq!(report.quanta[0].time, 0);
        assert_eq!(report.quanta[1].time, 1);
        assert_eq!(report.served(TaskId(0)), 1);
        assert_eq!(report.served(TaskId(1)), 1);
        assert_eq!(report.idle_quanta(), 0);
        assert_eq!(sim.system().time(), 2);
    }

    #[tokio::test]
    async fn every_task_is_served_its_share_over_hyperperiods() {
        let tasks = [(1, 2), (2, 3), (1, 3), (1, 6)];
        let mut sim = simulation(2, &tasks);
        let report = sim.run(60).await.unwrap();

        // Ten hyperperiods of six quanta each
        for (i, &(c, t)) in tasks.iter().enumerate() {
            let expected = (60 / t * c) as usize;
            assert_eq!(report.served(TaskId(i as u64)), expected, "task {i}");
        }
    }

    #[tokio::test]
    async fn underloaded_system_records_idle_quanta() {
        let mut sim = simulation(1, &[(1, 3)]);
        let report = sim.run(0).await.unwrap();
        assert_eq!(report.quanta.len(), 3);
        assert_eq!(report.served(TaskId(0)), 1);
        assert_eq!(report.idle_quanta(), 2);
        assert_eq!(report.summary.to_string(), "U=0.33 n=1 m=1 H=3 dt=1");
    }

    #[tokio::test]
    async fn concurrent_mode_produces_the_same_schedule() {
        let tasks = [(1, 2), (2, 3), (1, 3), (1, 6)];
        let sequential = simulation(2, &tasks).run(12).await.unwrap();
        let concurrent = simulation(2, &tasks)
            .with_mode(Mode::Concurrent)
            .run(12)
            .await
            .unwrap();
        assert_eq!(concurrent.quanta, sequential.quanta);
    }

    #[tokio::test]
    async fn huge_iteration_count_stops_at_the_first_fault() {
        let mut sim = simulation(1, &[(1, 2)]).with_proportion(3);
        let err = tokio::time::timeout(Duration::from_secs(5), sim.run(u64::MAX))
            .await
            .expect("run returns at the first fault")
            .unwrap_err();
        assert!(
            matches!(err, SimError::Selection(SelectionFault::InvalidProportion { proportion: 3 })),
            "{err}"
        );
        assert_eq!(sim.system().time(), 0);
    }

    #[tokio::test]
    async fn invalid_proportion_stops_the_run() {
        let mut sim = simulation(1, &[(1, 2)]).with_proportion(0);
        let err = sim.run(3).await.unwrap_err();
        assert!(matches!(err, SimError::Selection(_)), "{err}");
        assert_eq!(sim.system().time(), 0);
    }
}
