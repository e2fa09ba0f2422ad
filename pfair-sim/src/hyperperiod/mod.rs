/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Quantum size and hyperperiod of a task set.
//!
//! * The **quantum** `dt` is the GCD of every admitted task's `C`, `D` and
//!   `T`: the largest step that never jumps over a cost, deadline or period
//!   boundary.
//! * The **hyperperiod** `H` is the LCM of every period: the length after
//!   which the whole schedule repeats.
//!
//! [`Timebase`] folds both incrementally, one task at a time, and is
//! immutable: [`Timebase::admit`] returns the next value so the caller only
//! commits it once the rest of admission has succeeded.

pub mod math;

use tracing::warn;

use crate::task::{Parameters, Time};
use math::{gcd_all, lcm};

/// Hyperperiods longer than this many quanta are legal but produce very long
/// default runs, so they are logged.
pub const LARGE_HYPERPERIOD_QUANTA: Time = 1_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur while folding periods.
#[derive(Debug, PartialEq, Eq)]
pub enum HyperperiodError {
    /// LCM calculation overflowed [`Time`].
    Overflow { a: Time, b: Time },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── Timebase ──────────────────────────────────────────────────────────────────

/// Quantum size and hyperperiod of the tasks admitted so far.
///
/// Both are `0` for an empty task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timebase {
    pub quantum: Time,
    pub hyperperiod: Time,
}

impl Timebase {
    /// Timebase after additionally admitting a task with `params`.
    ///
    /// # Errors
    /// [`HyperperiodError::Overflow`] if the new hyperperiod overflows.
    pub fn admit(&self, params: &Parameters) -> Result<Timebase, HyperperiodError> {
        let quantum = gcd_all(self.quantum, &[params.c, params.d, params.t]);
        let hyperperiod = lcm(self.hyperperiod, params.t)?;

        if quantum > 0 && hyperperiod / quantum > LARGE_HYPERPERIOD_QUANTA {
            warn!(
                hyperperiod,
                quantum,
                quanta = hyperperiod / quantum,
                "hyperperiod spans a very large number of quanta"
            );
        }

        Ok(Timebase {
            quantum,
            hyperperiod,
        })
    }

    /// Number of quanta in one hyperperiod (`0` when empty).
    pub fn quanta(&self) -> Time {
        if self.quantum == 0 {
            0
        } else {
            self.hyperperiod / self.quantum
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn timebase_of(tasks: &[Parameters]) -> Result<Timebase, HyperperiodError> {
        tasks
            .iter()
            .try_fold(Timebase::default(), |tb, p| tb.admit(p))
    }

    #[test]
    fn empty_timebase_is_zero() {
        let tb = timebase_of(&[]).unwrap();
        assert_eq!(tb, Timebase::default());
        assert_eq!(tb.quanta(), 0);
    }

    #[test]
    fn single_task_quantum_is_gcd_of_c_d_t() {
        let tb = timebase_of(&[Parameters::new(3, 6)]).unwrap();
        assert_eq!(tb.quantum, 3);
        assert_eq!(tb.hyperperiod, 6);
        assert_eq!(tb.quanta(), 2);
    }

    #[test]
    fn explicit_deadline_participates_in_quantum() {
        let tb = timebase_of(&[Parameters::new(4, 8).with_deadline(6)]).unwrap();
        assert_eq!(tb.quantum, 2);
        assert_eq!(tb.hyperperiod, 8);
    }

    #[test]
    fn hyperperiod_is_lcm_of_periods() {
        let tasks = [
            Parameters::new(1, 2),
            Parameters::new(1, 3),
            Parameters::new(2, 4),
        ];
        let tb = timebase_of(&tasks).unwrap();
        assert_eq!(tb.hyperperiod, 12);
        assert_eq!(tb.quantum, 1);
    }

    #[test]
    fn quantum_divides_every_parameter() {
        let tasks = [
            Parameters::new(4, 12),
            Parameters::new(6, 18),
            Parameters::new(8, 24).with_deadline(16),
        ];
        let tb = timebase_of(&tasks).unwrap();
        for p in &tasks {
            assert_eq!(p.c % tb.quantum, 0);
            assert_eq!(p.d % tb.quantum, 0);
            assert_eq!(p.t % tb.quantum, 0);
        }
    }

    #[test]
    fn admit_does_not_mutate_on_overflow() {
        let tb = Timebase {
            quantum: 1,
            hyperperiod: Time::MAX / 2,
        };
        let huge = Parameters::new(1, Time::MAX / 2 - 1);
        assert!(tb.admit(&huge).is_err());
        assert_eq!(tb.hyperperiod, Time::MAX / 2);
    }
}
