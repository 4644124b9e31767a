// SPDX-License-Identifier: MIT

//! Clock abstraction so deadline and backoff logic is testable without
//! real sleeps.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic clock. Real code uses [`SystemClock`]; tests use [`FakeClock`].
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The real, wall-clock-backed implementation.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A controllable clock for deterministic deadline/backoff tests.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { current: Arc::new(Mutex::new(Instant::now())) }
    }

    pub fn advance(&self, duration: Duration) {
        *self.current.lock() += duration;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
