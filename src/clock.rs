//! A logical clock fed by wall-clock samples (spec Non-goals: no
//! requirement to simulate wall-clock seconds exactly).
//!
//! `Order`, `Shelf`, and the policy only ever see `now` as a plain
//! `f64` number of time units; `Clock` is the single seam where that
//! number is derived from real elapsed time, so the rest of the core
//! stays pure and trivially testable with a `FixedClock`.

use std::time::Instant;

use crate::order::TimeUnit;

/// Supplies the current time, in the run's configured time unit, as an
/// elapsed count since the kitchen started.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Samples `Instant::now()` and scales it into the configured
/// `TimeUnit`. One `WallClock` per run; its epoch is fixed at
/// construction.
pub struct WallClock {
    epoch: Instant,
    unit: TimeUnit,
}

impl WallClock {
    pub fn new(unit: TimeUnit) -> Self {
        Self {
            epoch: Instant::now(),
            unit,
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> f64 {
        let elapsed = self.epoch.elapsed();
        match self.unit {
            TimeUnit::Milliseconds => elapsed.as_secs_f64() * 1_000.0,
            TimeUnit::Seconds => elapsed.as_secs_f64(),
        }
    }
}

/// A clock that only advances when told to. Used by unit tests across
/// `order`/`decay`/`policy` and by the scenario tests under `tests/`,
/// which need deterministic control over `now` without sleeping for
/// real seconds.
pub struct FixedClock {
    now: std::sync::atomic::AtomicU64, // bits of an f64, for interior mutability without a Mutex
}

impl FixedClock {
    pub fn new(now: f64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now.to_bits()),
        }
    }

    pub fn set(&self, now: f64) {
        self.now
            .store(now.to_bits(), std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.now.load(std::sync::atomic::Ordering::SeqCst))
    }
}
