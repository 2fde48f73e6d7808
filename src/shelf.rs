//! Bounded collection of orders with a type label, an accepted-temp
//! set, and a decay-rate multiplier applied to residents.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::order::{Order, OrderId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShelfError {
    #[error("order temp {temp:?} not accepted on shelf {shelf_type:?}")]
    InvalidOrderType { shelf_type: String, temp: String },
}

#[derive(Debug, Clone)]
pub struct Shelf {
    pub shelf_type: String,
    pub accepted_types: HashSet<String>,
    pub capacity: usize,
    pub decay_rate_multiplier: f64,
    orders: HashMap<OrderId, Order>,
}

impl Shelf {
    pub fn new(
        shelf_type: impl Into<String>,
        capacity: usize,
        decay_rate_multiplier: f64,
    ) -> Self {
        let shelf_type = shelf_type.into();
        let accepted_types = HashSet::from([shelf_type.clone()]);
        Self {
            shelf_type,
            accepted_types,
            capacity,
            decay_rate_multiplier,
            orders: HashMap::new(),
        }
    }

    /// Overflow shelves are constructed with `accepted_types = {type}`
    /// by default (see spec.md §9 open questions) and must have their
    /// accepted set widened explicitly before use.
    pub fn set_accepted_types(&mut self, accepted: impl IntoIterator<Item = String>) {
        self.accepted_types = accepted.into_iter().collect();
    }

    /// `false` if the shelf is full or the order is already present;
    /// `Err` if the order's temp isn't accepted here.
    pub fn add(&mut self, order: Order) -> Result<bool, ShelfError> {
        if !self.accepted_types.contains(&order.temp) {
            return Err(ShelfError::InvalidOrderType {
                shelf_type: self.shelf_type.clone(),
                temp: order.temp.clone(),
            });
        }
        if self.orders.len() >= self.capacity || self.orders.contains_key(&order.id) {
            return Ok(false);
        }
        self.orders.insert(order.id, order);
        Ok(true)
    }

    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.orders.contains_key(&id)
    }

    pub fn is_full(&self) -> bool {
        self.orders.len() >= self.capacity
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Deep copy for event snapshots: every contained `Order` is
    /// cloned so later mutation never leaks into an already-emitted
    /// event.
    pub fn snapshot(&self) -> Shelf {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::TimeUnit;

    fn mk(id: OrderId, temp: &str) -> Order {
        let mut o = Order::new(id, "x", temp, 10.0, 0.0, TimeUnit::Seconds);
        o.initialize(0.0);
        o
    }

    #[test]
    fn rejects_wrong_temp() {
        let mut shelf = Shelf::new("hot", 1, 1.0);
        let err = shelf.add(mk(1, "cold")).unwrap_err();
        assert!(matches!(err, ShelfError::InvalidOrderType { .. }));
    }

    #[test]
    fn capacity_bound_enforced() {
        let mut shelf = Shelf::new("hot", 1, 1.0);
        assert!(shelf.add(mk(1, "hot")).unwrap());
        assert!(!shelf.add(mk(2, "hot")).unwrap());
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn adding_same_id_twice_is_a_noop_add() {
        let mut shelf = Shelf::new("hot", 2, 1.0);
        assert!(shelf.add(mk(1, "hot")).unwrap());
        assert!(!shelf.add(mk(1, "hot")).unwrap());
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn remove_reports_presence() {
        let mut shelf = Shelf::new("hot", 1, 1.0);
        shelf.add(mk(1, "hot")).unwrap();
        assert!(shelf.remove(1).is_some());
        assert!(shelf.remove(1).is_none());
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut shelf = Shelf::new("hot", 2, 1.0);
        shelf.add(mk(1, "hot")).unwrap();
        let snap = shelf.snapshot();
        shelf.remove(1);
        assert!(shelf.is_empty());
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn overflow_defaults_to_single_type_until_widened() {
        let mut overflow = Shelf::new("overflow", 5, 2.0);
        assert!(overflow.add(mk(1, "hot")).is_err());
        overflow.set_accepted_types(["hot".into(), "cold".into(), "frozen".into()]);
        assert!(overflow.add(mk(1, "hot")).unwrap());
    }
}
