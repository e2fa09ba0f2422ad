/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Shared simulated clock used as the per-quantum barrier of concurrent
//! stepping.
//!
//! The orchestrator is the only writer: it calls [`Clock::increment`] exactly
//! once per quantum.  Workers finish their own state transition and then
//! [`synchronize`](Clock::synchronize) on the time the quantum ends at, so no
//! worker can run ahead into the next quantum.
//!
//! Backed by a `tokio::sync::watch` channel: every increment is broadcast to
//! all waiters, and a waiter that subscribes late still observes the latest
//! value.

use tokio::sync::watch;

use crate::task::Time;

#[derive(Debug)]
pub struct Clock {
    tx: watch::Sender<Time>,
}

impl Clock {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Current simulated time.
    pub fn now(&self) -> Time {
        *self.tx.borrow()
    }

    /// Advance the clock by `dt` and wake every waiter.
    pub fn increment(&self, dt: Time) {
        self.tx.send_modify(|t| *t += dt);
    }

    /// Rewind to zero.  Only valid while no worker is waiting.
    pub fn reset(&self) {
        self.tx.send_replace(0);
    }

    /// Wait until the clock reads exactly `expected`.
    pub async fn synchronize(&self, expected: Time) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|t| *t == expected).await;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn starts_at_zero_and_increments() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        clock.increment(3);
        clock.increment(2);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn reset_rewinds_to_zero() {
        let clock = Clock::new();
        clock.increment(7);
        clock.reset();
        assert_eq!(clock.now(), 0);
    }

    #[tokio::test]
    async fn synchronize_returns_immediately_when_already_there() {
        let clock = Clock::new();
        clock.increment(1);
        tokio::time::timeout(Duration::from_secs(1), clock.synchronize(1))
            .await
            .expect("clock already at the expected time");
    }

    #[tokio::test]
    async fn synchronize_blocks_until_increment() {
        let clock = Arc::new(Clock::new());
        let waiter = {
            let clock = Arc::clone(&clock);
            tokio::spawn(async move {
                clock.synchronize(2).await;
                clock.now()
            })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished(), "waiter must not pass the barrier early");

        clock.increment(2);
        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released")
            .unwrap();
        assert_eq!(seen, 2);
    }
}
