/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exact utilisation bookkeeping for PFair admission.
//!
//! # Theory
//! PFair is optimal on identical multiprocessors: a set of periodic tasks
//! with implicit deadlines is schedulable on `m` processors **if and only
//! if**
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq m$$
//!
//! The test sits exactly on the boundary for common task sets (two tasks of
//! `1/2` on one processor, three of `1/3`, ...), so the sum is kept as a
//! reduced fraction instead of an `f64`.

use std::fmt;

use crate::hyperperiod::math::gcd;
use crate::task::{Parameters, Time};

/// Non-negative rational `num / den`, always reduced, `den > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utilization {
    num: Time,
    den: Time,
}

impl Utilization {
    pub const ZERO: Utilization = Utilization { num: 0, den: 1 };

    /// `C / T` of a task.  A zero period yields zero.
    pub fn of(params: &Parameters) -> Self {
        if params.t == 0 {
            return Self::ZERO;
        }
        Self::reduced(params.c, params.t)
    }

    fn reduced(num: Time, den: Time) -> Self {
        let g = gcd(num, den).max(1);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Exact sum, or `None` if an intermediate product overflows.
    pub fn checked_add(self, other: Utilization) -> Option<Utilization> {
        let g = gcd(self.den, other.den).max(1);
        let den = (self.den / g).checked_mul(other.den)?;
        let num = self
            .num
            .checked_mul(den / self.den)?
            .checked_add(other.num.checked_mul(den / other.den)?)?;
        Some(Self::reduced(num, den))
    }

    /// `true` if the utilisation fits on `m` processors (`U ≤ m`).
    pub fn fits(&self, m: usize) -> bool {
        let Ok(m) = Time::try_from(m) else {
            return true;
        };
        match m.checked_mul(self.den) {
            Some(capacity) => self.num <= capacity,
            // m · den beyond Time::MAX always exceeds num
            None => true,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for Utilization {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn u(c: Time, t: Time) -> Utilization {
        Utilization::of(&Parameters::new(c, t))
    }

    #[test]
    fn of_reduces_fraction() {
        assert_eq!(u(2, 4), u(1, 2));
        assert!((u(3, 6).as_f64() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_cost_is_zero() {
        assert!(u(0, 5).is_zero());
        assert_eq!(Utilization::default(), Utilization::ZERO);
    }

    #[test]
    fn thirds_sum_to_exactly_one() {
        let total = [u(1, 3), u(1, 3), u(1, 3)]
            .into_iter()
            .try_fold(Utilization::ZERO, |acc, x| acc.checked_add(x))
            .unwrap();
        assert_eq!(total, u(1, 1));
        assert!(total.fits(1));
    }

    #[test]
    fn boundary_is_inclusive() {
        let total = u(1, 2).checked_add(u(1, 2)).unwrap();
        assert!(total.fits(1), "U == m must be admitted");
    }

    #[test]
    fn overload_does_not_fit() {
        let total = u(2, 3).checked_add(u(2, 3)).unwrap();
        assert!(!total.fits(1));
        assert!(total.fits(2));
        assert!((total.as_f64() - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mixed_denominators_add_exactly() {
        let total = u(1, 4).checked_add(u(1, 6)).unwrap();
        assert_eq!(total, u(5, 12));
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(u(2, 3).to_string(), "0.67");
    }
}
