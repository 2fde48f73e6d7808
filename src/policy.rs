//! `OverflowPolicy`: the three decision procedures the coordinator
//! calls when a shelf saturates (spec.md §4.4). Implementations are
//! pure with respect to the kitchen state snapshot they observe — any
//! decay-rate probing they perform to evaluate a hypothetical must be
//! restored before returning.

use crate::error::KitchenError;
use crate::order::{Order, OrderId};

/// Where an order currently resides, as seen by the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Residency {
    Temp(String),
    Overflow,
}

/// The narrow view of kitchen state the policy is allowed to read and
/// probe-mutate. Implemented by `kitchen::KitchenState`; kept as a
/// trait so the policy never needs to know about timers, the event
/// sink, or the coordinator mutex.
pub trait PolicyView {
    fn temp_shelf_multiplier(&self, temp: &str) -> Option<f64>;
    fn overflow_multiplier(&self) -> f64;
    /// Ids of every order on the temperature shelf for `temp`, or an
    /// empty vec if no such shelf exists.
    fn temp_shelf_order_ids(&self, temp: &str) -> Vec<OrderId>;
    fn overflow_order_ids(&self) -> Vec<OrderId>;
    fn residency(&self, id: OrderId) -> Option<Residency>;
    fn order(&self, id: OrderId) -> Option<&Order>;
    fn order_mut(&mut self, id: OrderId) -> Option<&mut Order>;
}

pub trait OverflowPolicy: Send + Sync {
    /// Which of {incoming} ∪ {residents of incoming's temp shelf}
    /// should move to overflow.
    fn on_temp_shelf_full(
        &self,
        view: &mut dyn PolicyView,
        incoming: &mut Order,
        now: f64,
    ) -> Result<OrderId, KitchenError>;

    /// Which order to discard, and optionally which order should move
    /// into the slot it vacates.
    fn on_overflow_shelf_full(
        &self,
        view: &mut dyn PolicyView,
        incoming: &mut Order,
        now: f64,
    ) -> Result<(OrderId, Option<OrderId>), KitchenError>;

    /// Which overflow order (if any) should be promoted into a
    /// freshly vacated temperature-shelf slot.
    fn on_order_removed(&self, view: &dyn PolicyView, removed: &Order, now: f64) -> Option<OrderId>;
}

/// The strategy described in spec.md §4.4: longest-projected-lifetime
/// wins a move to overflow, shortest-remaining-lifetime is sacrificed
/// under total saturation.
pub struct DefaultOverflowPolicy;

fn lifetime_of(order: &Order, now: f64) -> f64 {
    order.lifetime_remaining(now).unwrap_or(0.0)
}

/// Probe `id`'s decay rate as `base_rate * multiplier`, evaluate
/// `lifetime_remaining(now)`, then restore to `restore_rate`.
fn probe(
    view: &mut dyn PolicyView,
    id: OrderId,
    probe_rate: f64,
    restore_rate: f64,
    now: f64,
) -> Result<f64, KitchenError> {
    let order = view
        .order_mut(id)
        .ok_or_else(|| KitchenError::InvalidProcedure {
            order_id: id,
            detail: "order vanished mid-probe".into(),
        })?;
    order.update_decay_rate(now, probe_rate)?;
    let lt = order.lifetime_remaining(now)?;
    order.update_decay_rate(now, restore_rate)?;
    Ok(lt)
}

/// Restore rate for an order currently resident somewhere: its base
/// `decay_rate` times the multiplier of its present shelf.
fn resident_restore_rate(view: &dyn PolicyView, id: OrderId) -> Option<f64> {
    let order = view.order(id)?;
    let base = order.decay_rate;
    match view.residency(id)? {
        Residency::Overflow => Some(base * view.overflow_multiplier()),
        Residency::Temp(temp) => Some(base * view.temp_shelf_multiplier(&temp).unwrap_or(1.0)),
    }
}

impl OverflowPolicy for DefaultOverflowPolicy {
    fn on_temp_shelf_full(
        &self,
        view: &mut dyn PolicyView,
        incoming: &mut Order,
        now: f64,
    ) -> Result<OrderId, KitchenError> {
        let overflow_mult = view.overflow_multiplier();
        let mut candidates: Vec<OrderId> = view.temp_shelf_order_ids(&incoming.temp);
        candidates.sort_unstable();
        let incoming_id = incoming.id;

        let incoming_probe_rate = incoming.decay_rate * overflow_mult;
        let incoming_original_rate = incoming.current_decay_rate()?;
        incoming.update_decay_rate(now, incoming_probe_rate)?;
        let mut best_id = incoming_id;
        let mut best_lt = incoming.lifetime_remaining(now)?;
        incoming.update_decay_rate(now, incoming_original_rate)?;

        for &id in &candidates {
            let base_rate = view
                .order(id)
                .ok_or_else(|| KitchenError::InvalidProcedure {
                    order_id: id,
                    detail: "candidate vanished before probe".into(),
                })?
                .decay_rate;
            let restore_rate = resident_restore_rate(view, id).unwrap_or(base_rate);
            let lt = probe(view, id, base_rate * overflow_mult, restore_rate, now)?;
            if lt > best_lt {
                best_lt = lt;
                best_id = id;
            }
        }

        Ok(best_id)
    }

    fn on_overflow_shelf_full(
        &self,
        view: &mut dyn PolicyView,
        incoming: &mut Order,
        now: f64,
    ) -> Result<(OrderId, Option<OrderId>), KitchenError> {
        let incoming_id = incoming.id;
        let overflow_ids = view.overflow_order_ids();

        // Eligible temps: incoming's own temp, plus the temp of every overflow resident.
        let mut eligible_temps: Vec<String> = vec![incoming.temp.clone()];
        for &id in &overflow_ids {
            if let Some(order) = view.order(id) {
                if !eligible_temps.contains(&order.temp) {
                    eligible_temps.push(order.temp.clone());
                }
            }
        }

        let mut temp_shelf_ids: Vec<OrderId> = Vec::new();
        for temp in &eligible_temps {
            temp_shelf_ids.extend(view.temp_shelf_order_ids(temp));
        }

        let mut pool: Vec<OrderId> = vec![incoming_id];
        pool.extend(overflow_ids.iter().copied());
        pool.extend(temp_shelf_ids.iter().copied());
        pool.sort_unstable();
        pool.dedup();

        let mut removal = incoming_id;
        let mut removal_lt = lifetime_of(incoming, now);
        for &id in &pool {
            if id == incoming_id {
                continue;
            }
            let Some(order) = view.order(id) else {
                continue;
            };
            let lt = lifetime_of(order, now);
            if lt < removal_lt {
                removal_lt = lt;
                removal = id;
            }
        }

        if removal == incoming_id {
            return Ok((incoming_id, None));
        }

        match view.residency(removal) {
            Some(Residency::Temp(temp)) => {
                let mut replacement_candidates: Vec<OrderId> = overflow_ids
                    .iter()
                    .copied()
                    .filter(|&id| view.order(id).map(|o| o.temp == temp).unwrap_or(false))
                    .collect();
                if incoming.temp == temp {
                    replacement_candidates.push(incoming_id);
                }
                replacement_candidates.sort_unstable();

                let mut best: Option<(OrderId, f64)> = None;
                for id in replacement_candidates {
                    let lt = if id == incoming_id {
                        lifetime_of(incoming, now)
                    } else {
                        view.order(id).map(|o| lifetime_of(o, now)).unwrap_or(f64::MAX)
                    };
                    if best.map(|(_, blt)| lt < blt).unwrap_or(true) {
                        best = Some((id, lt));
                    }
                }
                Ok((removal, best.map(|(id, _)| id)))
            }
            Some(Residency::Overflow) => {
                let overflow_mult = view.overflow_multiplier();
                let mut replacement_candidates: Vec<OrderId> = temp_shelf_ids
                    .iter()
                    .copied()
                    .filter(|&id| view.order(id).map(|o| o.temp == incoming.temp).unwrap_or(false))
                    .collect();
                replacement_candidates.push(incoming_id);
                replacement_candidates.sort_unstable();
                replacement_candidates.dedup();

                let incoming_original_rate = incoming.current_decay_rate()?;
                let incoming_probe_rate = incoming.decay_rate * overflow_mult;

                let mut best: Option<(OrderId, f64)> = None;
                for id in &replacement_candidates {
                    let lt = if *id == incoming_id {
                        incoming.update_decay_rate(now, incoming_probe_rate)?;
                        let lt = incoming.lifetime_remaining(now)?;
                        incoming.update_decay_rate(now, incoming_original_rate)?;
                        lt
                    } else {
                        let base_rate = view.order(*id).map(|o| o.decay_rate).unwrap_or(0.0);
                        let restore_rate = resident_restore_rate(view, *id).unwrap_or(base_rate);
                        probe(view, *id, base_rate * overflow_mult, restore_rate, now)?
                    };
                    if best.map(|(_, blt)| lt > blt).unwrap_or(true) {
                        best = Some((*id, lt));
                    }
                }
                Ok((removal, best.map(|(id, _)| id)))
            }
            None => Err(KitchenError::InvalidProcedure {
                order_id: removal,
                detail: "removal candidate is on no shelf".into(),
            }),
        }
    }

    fn on_order_removed(&self, view: &dyn PolicyView, removed: &Order, now: f64) -> Option<OrderId> {
        let mut best: Option<(OrderId, f64)> = None;
        for id in view.overflow_order_ids() {
            let order = view.order(id)?;
            if order.temp != removed.temp {
                continue;
            }
            let lt = lifetime_of(order, now);
            if best.map(|(_, blt)| lt < blt).unwrap_or(true) {
                best = Some((id, lt));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::TimeUnit;
    use std::collections::HashMap;

    /// Minimal in-memory `PolicyView` for unit-testing the policy in
    /// isolation from the coordinator.
    struct TestView {
        temp_shelves: HashMap<String, (f64, Vec<OrderId>)>,
        overflow_mult: f64,
        overflow: Vec<OrderId>,
        orders: HashMap<OrderId, Order>,
        residency: HashMap<OrderId, Residency>,
    }

    impl PolicyView for TestView {
        fn temp_shelf_multiplier(&self, temp: &str) -> Option<f64> {
            self.temp_shelves.get(temp).map(|(m, _)| *m)
        }
        fn overflow_multiplier(&self) -> f64 {
            self.overflow_mult
        }
        fn temp_shelf_order_ids(&self, temp: &str) -> Vec<OrderId> {
            self.temp_shelves
                .get(temp)
                .map(|(_, ids)| ids.clone())
                .unwrap_or_default()
        }
        fn overflow_order_ids(&self) -> Vec<OrderId> {
            self.overflow.clone()
        }
        fn residency(&self, id: OrderId) -> Option<Residency> {
            self.residency.get(&id).cloned()
        }
        fn order(&self, id: OrderId) -> Option<&Order> {
            self.orders.get(&id)
        }
        fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
            self.orders.get_mut(&id)
        }
    }

    fn mk(id: OrderId, temp: &str, shelf_life: f64, rate: f64, now: f64) -> Order {
        let mut o = Order::new(id, "x", temp, shelf_life, rate, TimeUnit::Seconds);
        o.initialize(now);
        o
    }

    #[test]
    fn on_temp_shelf_full_prefers_longest_overflow_projected_lifetime() {
        let now = 0.0;
        let slow = mk(1, "frozen", 100.0, 0.1, now); // long remaining life
        let fast = mk(2, "frozen", 100.0, 0.2, now);
        let mut incoming = mk(3, "frozen", 10.0, 5.0, now); // short life, not a good overflow candidate

        let mut view = TestView {
            temp_shelves: HashMap::from([("frozen".into(), (1.0, vec![1, 2]))]),
            overflow_mult: 3.0,
            overflow: vec![],
            orders: HashMap::from([(1, slow.clone()), (2, fast.clone())]),
            residency: HashMap::from([(1, Residency::Temp("frozen".into())), (2, Residency::Temp("frozen".into()))]),
        };

        let before_1 = (view.orders[&1].freshness(now).unwrap(), view.orders[&1].lifetime_remaining(now).unwrap());

        let chosen = DefaultOverflowPolicy.on_temp_shelf_full(&mut view, &mut incoming, now).unwrap();
        assert_eq!(chosen, 1); // slowest decaying resident wins the move

        // probe is observationally pure
        let after_1 = (view.orders[&1].freshness(now).unwrap(), view.orders[&1].lifetime_remaining(now).unwrap());
        assert_eq!(before_1, after_1);
    }

    #[test]
    fn on_order_removed_rescues_frailest_matching_overflow_order() {
        let now = 0.0;
        let frail = mk(10, "cold", 20.0, 1.0, now);
        let sturdy = mk(11, "cold", 200.0, 0.01, now);
        let removed = mk(99, "cold", 10.0, 0.0, now);

        let view = TestView {
            temp_shelves: HashMap::new(),
            overflow_mult: 2.0,
            overflow: vec![10, 11],
            orders: HashMap::from([(10, frail), (11, sturdy)]),
            residency: HashMap::from([(10, Residency::Overflow), (11, Residency::Overflow)]),
        };

        let promoted = DefaultOverflowPolicy.on_order_removed(&view, &removed, now);
        assert_eq!(promoted, Some(10));
    }

    #[test]
    fn on_order_removed_ignores_mismatched_temps() {
        let now = 0.0;
        let wrong_temp = mk(1, "hot", 5.0, 0.0, now);
        let removed = mk(99, "cold", 10.0, 0.0, now);
        let view = TestView {
            temp_shelves: HashMap::new(),
            overflow_mult: 2.0,
            overflow: vec![1],
            orders: HashMap::from([(1, wrong_temp)]),
            residency: HashMap::from([(1, Residency::Overflow)]),
        };
        assert_eq!(DefaultOverflowPolicy.on_order_removed(&view, &removed, now), None);
    }
}
