/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! PFair multiprocessor scheduling simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task/           – periodic task state machine
//! ├── processor/      – processors and the free-processor pool
//! ├── clock/          – shared quantum clock (concurrent barrier)
//! ├── hyperperiod/    – GCD / LCM helpers, quantum and hyperperiod
//! ├── scheduler/      – Scheduler trait, PFair, exact utilisation
//! ├── system/         – TaskSystem pools + sequential / concurrent stepping
//! ├── simulation/     – run loop and report
//! ├── taskset/        – plain-text task-set files
//! ├── config/         – YAML run configuration
//! └── error/          – fault taxonomy
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod hyperperiod;
pub mod processor;
pub mod scheduler;
pub mod simulation;
pub mod system;
pub mod task;
pub mod taskset;
