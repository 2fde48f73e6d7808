//! The driver dispatcher: an external collaborator fixed only by its
//! interface (spec.md §4.6). Returns a driver with a bounded-random
//! pickup delay.

use rand::Rng;

use crate::order::{OrderId, TimeUnit};

#[derive(Debug, Clone, Copy)]
pub struct Driver {
    pub time_unit: TimeUnit,
    /// Non-negative, drawn uniformly from `[min, max]`.
    pub duration: u64,
    pub order_id: OrderId,
}

pub trait Dispatcher: Send + Sync {
    fn dispatch_driver(&self, order_id: OrderId, time_unit: TimeUnit) -> Driver;
}

/// Draws `duration` uniformly from a closed `[min, max]` interval.
pub struct RandomDispatcher {
    min: u64,
    max: u64,
}

impl RandomDispatcher {
    pub fn new(min: u64, max: u64) -> Self {
        assert!(min <= max, "driver min duration must be <= max duration");
        Self { min, max }
    }
}

impl Dispatcher for RandomDispatcher {
    fn dispatch_driver(&self, order_id: OrderId, time_unit: TimeUnit) -> Driver {
        let duration = if self.min == self.max {
            self.min
        } else {
            rand::rng().random_range(self.min..=self.max)
        };
        Driver {
            time_unit,
            duration,
            order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_stays_within_bounds() {
        let dispatcher = RandomDispatcher::new(3, 8);
        for _ in 0..200 {
            let d = dispatcher.dispatch_driver(1, TimeUnit::Seconds);
            assert!(d.duration >= 3 && d.duration <= 8);
        }
    }

    #[test]
    fn degenerate_interval_is_exact() {
        let dispatcher = RandomDispatcher::new(0, 0);
        let d = dispatcher.dispatch_driver(1, TimeUnit::Seconds);
        assert_eq!(d.duration, 0);
    }
}
