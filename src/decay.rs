//! Pure decay math shared by `Order` and `OverflowPolicy`.
//!
//! Both functions are total and hold no state; they are the one place
//! the freshness formula is written down, so `Order` and the policy
//! never duplicate it.

/// Freshness of an order after `order_age` time units on a shelf with
/// the given `shelf_life` and `decay_rate`. Clamped at zero.
pub fn freshness(shelf_life: f64, decay_rate: f64, order_age: f64) -> f64 {
    (shelf_life - order_age * (1.0 + decay_rate)).max(0.0)
}

/// Time until freshness first reaches zero, starting from age 0.
pub fn lifetime(shelf_life: f64, decay_rate: f64) -> f64 {
    shelf_life / (1.0 + decay_rate)
}
