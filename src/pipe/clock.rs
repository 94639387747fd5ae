//! Time sources for the pipe
//!
//! `now_ms` must never go backwards.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Monotonic wall clock, zero at construction
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

/// Logical clock advanced explicitly by the test or driver
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now_ms: AtomicI64,
}

impl SimulatedClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        debug_assert!(delta_ms >= 0, "clock must not go backwards");
        self.now_ms.fetch_add(delta_ms.max(0), Ordering::SeqCst);
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
