/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers: GCD, checked LCM and their folds over task
//! parameters.
//!
//! Inputs are non-negative [`Time`] values; negative inputs are treated by
//! absolute value.

use super::HyperperiodError;
use crate::task::Time;

/// Iterative Euclidean GCD.  `gcd(0, x) == x`, so `0` is the identity of a
/// fold.
pub fn gcd(a: Time, b: Time) -> Time {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Checked LCM.  `lcm(0, x) == x`, so `0` (no period seen yet) is the
/// identity of a fold.
///
/// # Errors
/// [`HyperperiodError::Overflow`] if the result does not fit [`Time`].
pub fn lcm(a: Time, b: Time) -> Result<Time, HyperperiodError> {
    let (a, b) = (a.abs(), b.abs());
    if a == 0 {
        return Ok(b);
    }
    if b == 0 {
        return Ok(a);
    }

    // a / g is exact (g divides a by definition)
    let reduced = a / gcd(a, b);
    reduced
        .checked_mul(b)
        .ok_or(HyperperiodError::Overflow { a, b })
}

/// GCD of `acc` and every value in `values`.
pub fn gcd_all(acc: Time, values: &[Time]) -> Time {
    values.iter().fold(acc, |g, &v| gcd(g, v))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── gcd ───────────────────────────────────────────────────────────────────

    #[test]
    fn gcd_basic_cases() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(7, 3), 1);
        assert_eq!(gcd(6, 3), 3);
    }

    #[test]
    fn gcd_zero_is_identity() {
        assert_eq!(gcd(0, 5), 5);
        assert_eq!(gcd(5, 0), 5);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn gcd_all_folds_task_parameters() {
        // C=3, D=6, T=6 → quantum 3
        assert_eq!(gcd_all(0, &[3, 6, 6]), 3);
        // Adding C=1, D=2, T=2 drops it to 1
        assert_eq!(gcd_all(3, &[1, 2, 2]), 1);
    }

    // ── lcm ───────────────────────────────────────────────────────────────────

    #[test]
    fn lcm_basic_cases() {
        assert_eq!(lcm(4, 6).unwrap(), 12);
        assert_eq!(lcm(2, 2).unwrap(), 2);
        assert_eq!(lcm(3, 5).unwrap(), 15);
    }

    #[test]
    fn lcm_zero_is_identity() {
        assert_eq!(lcm(0, 6).unwrap(), 6);
        assert_eq!(lcm(6, 0).unwrap(), 6);
    }

    #[test]
    fn lcm_overflow_returns_error() {
        let a = Time::MAX / 2;
        let b = Time::MAX / 2 - 1; // consecutive integers are coprime
        assert!(matches!(lcm(a, b), Err(HyperperiodError::Overflow { .. })));
    }
}
