/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Processors and the free-processor pool.
//!
//! A [`Processor`] is a pure identity with a fixed capacity of one task.  It
//! is deliberately neither `Clone` nor `Copy`: the only way to bind it to a
//! task is to **move** it out of the [`ProcessorPool`], and the only way back
//! is to move it in again.  Two tasks can therefore never hold the same
//! processor at once.

use std::collections::VecDeque;
use std::fmt;

/// Stable processor identity, unique within one `TaskSystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessorId(pub usize);

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A single compute unit.
#[derive(Debug, PartialEq, Eq)]
pub struct Processor {
    id: ProcessorId,
}

impl Processor {
    pub fn id(&self) -> ProcessorId {
        self.id
    }
}

/// Pool of free processors.
///
/// Processors are handed out front-first and returned to the back, so with
/// every processor reclaimed at the end of each quantum the allocation order
/// is a stable rotation of the initial ids.
#[derive(Debug)]
pub struct ProcessorPool {
    free: VecDeque<Processor>,
    total: usize,
}

impl ProcessorPool {
    /// Create `m` processors with ids `0..m`.
    pub fn new(m: usize) -> Self {
        Self {
            free: (0..m).map(|i| Processor { id: ProcessorId(i) }).collect(),
            total: m,
        }
    }

    /// Take the next free processor, if any.
    pub fn take(&mut self) -> Option<Processor> {
        self.free.pop_front()
    }

    /// Return a processor to the pool.
    ///
    /// # Panics
    /// Panics in debug builds if the processor is already in the pool; a
    /// processor reaching this point twice is a bookkeeping bug.
    pub fn give_back(&mut self, processor: Processor) {
        debug_assert!(
            !self.free.iter().any(|p| p.id == processor.id),
            "processor {} returned to the pool twice",
            processor.id
        );
        self.free.push_back(processor);
    }

    /// Number of processors currently free.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of processors owned by the system (free or bound).
    pub fn total(&self) -> usize {
        self.total
    }

    /// Ids of the free processors in allocation order.
    pub fn free_ids(&self) -> Vec<ProcessorId> {
        self.free.iter().map(Processor::id).collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
