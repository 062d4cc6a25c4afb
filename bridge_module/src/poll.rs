//! Bounded retry-with-timeout primitive for waiting on external UI state.
//!
//! The chat page exposes no ready signal, so the agent has to poll. Every
//! wait goes through [`poll_until`] so an unresponsive page becomes an
//! explicit timeout instead of an infinite loop.

use std::time::{Duration, Instant};

/// Cadence and bound for one polling wait.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// The condition did not hold before the policy deadline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("condition not met after {waited:?}")]
pub struct PollTimeout {
    pub waited: Duration,
}

/// Run `condition` at `policy.interval` until it returns true or the
/// deadline passes. The first check happens immediately, so a condition
/// that already holds costs no sleep.
pub fn poll_until<F>(policy: PollPolicy, mut condition: F) -> Result<(), PollTimeout>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if condition() {
            return Ok(());
        }
        if start.elapsed() >= policy.timeout {
            return Err(PollTimeout {
                waited: start.elapsed(),
            });
        }
        std::thread::sleep(policy.interval);
    }
}
