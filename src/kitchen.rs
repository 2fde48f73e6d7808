//! The kitchen coordinator (spec.md §4.5): owns the shelves, consumes
//! the order stream, invokes the overflow policy, mutates shelves
//! under a single lock, schedules decay-expiry and driver-arrival
//! timers, and emits the event stream.
//!
//! Concurrency model (spec.md §5): one coordinator mutex guards all
//! shelf/timer state. Timers are `std::thread::sleep`-then-callback
//! threads, the same idiom the original CLI used for scheduling
//! pickups; their callbacks re-acquire the mutex before touching
//! anything. Cancellation is a generation counter per order per timer
//! kind — scheduling bumps it, firing checks it, a stale or missing
//! entry makes the callback a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;
use crate::dispatcher::Dispatcher;
use crate::error::KitchenError;
use crate::event::{EventType, OrderEvent, ShelvesSnapshot};
use crate::order::{Order, OrderId, TimeUnit};
use crate::policy::{OverflowPolicy, PolicyView, Residency};
use crate::shelf::Shelf;
use crate::source::OrderSource;

/// One temperature shelf's static configuration.
#[derive(Debug, Clone)]
pub struct ShelfSpec {
    pub temp: String,
    pub capacity: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct KitchenConfig {
    pub time_unit: TimeUnit,
    pub temp_shelves: Vec<ShelfSpec>,
    pub overflow_capacity: usize,
    pub overflow_multiplier: f64,
}

/// Running counters for the persisted log's tally line (spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Tally {
    pub received: u64,
    pub picked_up: u64,
    pub decayed: u64,
    pub removed: u64,
}

struct KitchenState {
    temp_shelves: HashMap<String, Shelf>,
    overflow: Shelf,
    decay_timers: HashMap<OrderId, u64>,
    driver_timers: HashMap<OrderId, u64>,
    next_generation: u64,
    tally: Tally,
}

impl KitchenState {
    fn temp_shelf_of(&self, id: OrderId) -> Option<String> {
        self.temp_shelves
            .iter()
            .find(|(_, shelf)| shelf.contains(id))
            .map(|(temp, _)| temp.clone())
    }

    fn residency(&self, id: OrderId) -> Option<Residency> {
        if let Some(temp) = self.temp_shelf_of(id) {
            return Some(Residency::Temp(temp));
        }
        if self.overflow.contains(id) {
            return Some(Residency::Overflow);
        }
        None
    }

    /// Removes `id` from wherever it currently sits, regardless of
    /// shelf. Used for true exits (pickup, decay, policy waste) — not
    /// for in-kitchen relocations, which call the specific shelf's
    /// `remove` directly so the other timer kind is left untouched.
    fn remove_wherever(&mut self, id: OrderId) -> Option<(Order, Residency)> {
        if let Some(temp) = self.temp_shelf_of(id) {
            let order = self.temp_shelves.get_mut(&temp)?.remove(id)?;
            return Some((order, Residency::Temp(temp)));
        }
        if self.overflow.contains(id) {
            let order = self.overflow.remove(id)?;
            return Some((order, Residency::Overflow));
        }
        None
    }

    fn order(&self, id: OrderId) -> Option<&Order> {
        if let Some(temp) = self.temp_shelf_of(id) {
            return self.temp_shelves.get(&temp)?.get(id);
        }
        self.overflow.get(id)
    }

    fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        if let Some(temp) = self.temp_shelf_of(id) {
            return self.temp_shelves.get_mut(&temp)?.get_mut(id);
        }
        self.overflow.get_mut(id)
    }
}

/// Adapts `KitchenState` to the narrow read/probe surface the policy
/// is allowed to see.
struct StateView<'a>(&'a mut KitchenState);

impl PolicyView for StateView<'_> {
    fn temp_shelf_multiplier(&self, temp: &str) -> Option<f64> {
        self.0.temp_shelves.get(temp).map(|s| s.decay_rate_multiplier)
    }
    fn overflow_multiplier(&self) -> f64 {
        self.0.overflow.decay_rate_multiplier
    }
    fn temp_shelf_order_ids(&self, temp: &str) -> Vec<OrderId> {
        self.0
            .temp_shelves
            .get(temp)
            .map(|s| s.orders().map(|o| o.id).collect())
            .unwrap_or_default()
    }
    fn overflow_order_ids(&self) -> Vec<OrderId> {
        self.0.overflow.orders().map(|o| o.id).collect()
    }
    fn residency(&self, id: OrderId) -> Option<Residency> {
        self.0.residency(id)
    }
    fn order(&self, id: OrderId) -> Option<&Order> {
        self.0.order(id)
    }
    fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.0.order_mut(id)
    }
}

/// The coordinator. Cheap to clone — every field is an `Arc` — so
/// timer callbacks can hold their own handle back into the kitchen.
#[derive(Clone)]
pub struct Kitchen {
    state: Arc<Mutex<KitchenState>>,
    config: Arc<KitchenConfig>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn OverflowPolicy>,
    dispatcher: Arc<dyn Dispatcher>,
    next_order_id: Arc<AtomicU64>,
}

impl Kitchen {
    pub fn new(
        config: KitchenConfig,
        clock: Arc<dyn Clock>,
        policy: Arc<dyn OverflowPolicy>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let mut temp_shelves = HashMap::new();
        let mut all_temps = Vec::new();
        for spec in &config.temp_shelves {
            temp_shelves.insert(
                spec.temp.clone(),
                Shelf::new(spec.temp.clone(), spec.capacity, spec.multiplier),
            );
            all_temps.push(spec.temp.clone());
        }

        // Shelf::new defaults accepted_types to {shelf_type}; the
        // overflow shelf must have this widened explicitly before use
        // (see shelf.rs) — done here, once, at kitchen construction.
        let mut overflow = Shelf::new("overflow", config.overflow_capacity, config.overflow_multiplier);
        overflow.set_accepted_types(all_temps);

        let state = KitchenState {
            temp_shelves,
            overflow,
            decay_timers: HashMap::new(),
            driver_timers: HashMap::new(),
            next_generation: 0,
            tally: Tally::default(),
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            config: Arc::new(config),
            clock,
            policy,
            dispatcher,
            next_order_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn shelf_temps(&self) -> Vec<String> {
        self.state.lock().unwrap().temp_shelves.keys().cloned().collect()
    }

    pub fn shelf(&self, temp: &str) -> Option<Shelf> {
        self.state.lock().unwrap().temp_shelves.get(temp).map(Shelf::snapshot)
    }

    pub fn overflow(&self) -> Shelf {
        self.state.lock().unwrap().overflow.snapshot()
    }

    pub fn tally(&self) -> Tally {
        self.state.lock().unwrap().tally
    }

    /// Subscribes to `source` and returns a cold event stream. See
    /// module docs and spec.md §4.5/§5 for the completion and
    /// cancellation contract.
    pub fn process_orders(&self, source: &dyn OrderSource) -> Receiver<Result<OrderEvent, KitchenError>> {
        let (tx, rx) = mpsc::channel();
        let kitchen = self.clone();
        let items = source.subscribe();
        thread::spawn(move || {
            for item in items {
                match item {
                    Err(e) => {
                        let _ = tx.send(Err(e.into()));
                        return;
                    }
                    Ok(raw) => {
                        let id = kitchen.next_order_id.fetch_add(1, Ordering::SeqCst);
                        let order = Order::new(
                            id,
                            raw.name,
                            raw.temp,
                            raw.shelf_life,
                            raw.decay_rate,
                            kitchen.config.time_unit,
                        );
                        if let Err(e) = kitchen.handle_incoming(order, &tx) {
                            warn!("halting stream: {e}");
                            let _ = tx.send(Err(e));
                            return;
                        }
                    }
                }
            }
            debug!("order source exhausted");
        });
        rx
    }

    fn duration_from_units(&self, units: f64) -> Duration {
        let units = units.max(0.0);
        match self.config.time_unit {
            TimeUnit::Seconds => Duration::from_secs_f64(units),
            TimeUnit::Milliseconds => Duration::from_secs_f64(units / 1_000.0),
        }
    }

    /// spec.md §4.5's per-incoming-order procedure, run to completion
    /// under one mutex acquisition.
    fn handle_incoming(
        &self,
        mut order: Order,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let now = self.clock.now();
        order.initialize(now);
        let order_id = order.id;
        let temp = order.temp.clone();

        let driver = self.dispatcher.dispatch_driver(order_id, self.config.time_unit);

        let mut state = self.state.lock().unwrap();
        state.tally.received += 1;
        self.schedule_driver_timer_locked(&mut state, order_id, driver.duration as f64, tx.clone());

        let temp_has_room = state
            .temp_shelves
            .get(&temp)
            .map(|s| !s.is_full())
            .unwrap_or(false);

        if temp_has_room {
            self.place_on_temp(&mut state, order, &temp, now, tx)?;
        } else if !state.overflow.is_full() {
            self.case_temp_full(&mut state, order, now, tx)?;
        } else {
            self.case_all_full(&mut state, order, now, tx)?;
        }
        Ok(())
    }

    /// Case B (spec.md §4.5): temp shelf full, overflow has room.
    fn case_temp_full(
        &self,
        state: &mut KitchenState,
        mut order: Order,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let temp = order.temp.clone();
        let order_id = order.id;
        let overflow_mult = state.overflow.decay_rate_multiplier;
        let temp_mult = state
            .temp_shelves
            .get(&temp)
            .map(|s| s.decay_rate_multiplier)
            .unwrap_or(1.0);

        let chosen = {
            let mut view = StateView(state);
            self.policy.on_temp_shelf_full(&mut view, &mut order, now)?
        };

        if chosen == order_id {
            order.update_decay_rate(now, order.decay_rate * overflow_mult)?;
            self.place_on_overflow(state, order, now, tx)?;
        } else {
            let mut resident = state
                .temp_shelves
                .get_mut(&temp)
                .and_then(|s| s.remove(chosen))
                .ok_or_else(|| KitchenError::InvalidProcedure {
                    order_id: chosen,
                    detail: "policy chose a resident no longer on the temp shelf".into(),
                })?;
            resident.update_decay_rate(now, resident.decay_rate * overflow_mult)?;
            self.place_on_overflow(state, resident, now, tx)?;

            order.update_decay_rate(now, order.decay_rate * temp_mult)?;
            self.place_on_temp(state, order, &temp, now, tx)?;
        }
        Ok(())
    }

    /// Case C (spec.md §4.5): temp shelf and overflow both full.
    fn case_all_full(
        &self,
        state: &mut KitchenState,
        mut order: Order,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let order_id = order.id;
        let incoming_temp = order.temp.clone();

        let (waste, replacement) = {
            let mut view = StateView(state);
            self.policy.on_overflow_shelf_full(&mut view, &mut order, now)?
        };

        if waste == order_id {
            // Discarded without ever being placed; the driver timer
            // dispatched in handle_incoming is left to find nothing.
            self.emit(state, &order, EventType::RemovedWaste, None, now, tx);
            return Ok(());
        }

        let waste_residency = state.residency(waste).ok_or_else(|| KitchenError::InvalidProcedure {
            order_id: waste,
            detail: "waste candidate is on no shelf".into(),
        })?;

        match waste_residency {
            Residency::Temp(waste_temp) => {
                let wasted = state
                    .temp_shelves
                    .get_mut(&waste_temp)
                    .and_then(|s| s.remove(waste))
                    .ok_or_else(|| KitchenError::InvalidProcedure {
                        order_id: waste,
                        detail: "waste vanished from its temp shelf".into(),
                    })?;
                state.decay_timers.remove(&waste);
                state.driver_timers.remove(&waste);
                self.emit(state, &wasted, EventType::RemovedWaste, Some(waste_temp.clone()), now, tx);

                match replacement {
                    Some(rid) if rid == order_id => {
                        let mult = state
                            .temp_shelves
                            .get(&waste_temp)
                            .map(|s| s.decay_rate_multiplier)
                            .unwrap_or(1.0);
                        order.update_decay_rate(now, order.decay_rate * mult)?;
                        self.place_on_temp(state, order, &waste_temp, now, tx)?;
                    }
                    Some(rid) => {
                        let mut repl = state.overflow.remove(rid).ok_or_else(|| KitchenError::InvalidProcedure {
                            order_id: rid,
                            detail: "replacement vanished from overflow".into(),
                        })?;
                        let mult = state
                            .temp_shelves
                            .get(&waste_temp)
                            .map(|s| s.decay_rate_multiplier)
                            .unwrap_or(1.0);
                        repl.update_decay_rate(now, repl.decay_rate * mult)?;
                        self.place_on_temp(state, repl, &waste_temp, now, tx)?;

                        let overflow_mult = state.overflow.decay_rate_multiplier;
                        order.update_decay_rate(now, order.decay_rate * overflow_mult)?;
                        self.place_on_overflow(state, order, now, tx)?;
                    }
                    None => {
                        debug!("no eligible replacement for vacated slot on {waste_temp}");
                    }
                }
            }
            Residency::Overflow => {
                let wasted = state.overflow.remove(waste).ok_or_else(|| KitchenError::InvalidProcedure {
                    order_id: waste,
                    detail: "waste vanished from overflow".into(),
                })?;
                state.decay_timers.remove(&waste);
                state.driver_timers.remove(&waste);
                let overflow_label = state.overflow.shelf_type.clone();
                self.emit(state, &wasted, EventType::RemovedWaste, Some(overflow_label), now, tx);

                match replacement {
                    Some(rid) if rid == order_id => {
                        let overflow_mult = state.overflow.decay_rate_multiplier;
                        order.update_decay_rate(now, order.decay_rate * overflow_mult)?;
                        self.place_on_overflow(state, order, now, tx)?;
                    }
                    Some(rid) => {
                        let mut repl = state
                            .temp_shelves
                            .get_mut(&incoming_temp)
                            .and_then(|s| s.remove(rid))
                            .ok_or_else(|| KitchenError::InvalidProcedure {
                                order_id: rid,
                                detail: "replacement vanished from its temp shelf".into(),
                            })?;
                        let overflow_mult = state.overflow.decay_rate_multiplier;
                        repl.update_decay_rate(now, repl.decay_rate * overflow_mult)?;
                        self.place_on_overflow(state, repl, now, tx)?;

                        let mult = state
                            .temp_shelves
                            .get(&incoming_temp)
                            .map(|s| s.decay_rate_multiplier)
                            .unwrap_or(1.0);
                        order.update_decay_rate(now, order.decay_rate * mult)?;
                        self.place_on_temp(state, order, &incoming_temp, now, tx)?;
                    }
                    None => {
                        debug!("no eligible replacement for vacated overflow slot");
                    }
                }
            }
        }
        Ok(())
    }

    fn place_on_temp(
        &self,
        state: &mut KitchenState,
        order: Order,
        temp: &str,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let order_id = order.id;
        let lifetime = order.lifetime_remaining(now)?;
        {
            let shelf = state
                .temp_shelves
                .get_mut(temp)
                .ok_or_else(|| KitchenError::InvalidProcedure {
                    order_id,
                    detail: format!("no temp shelf configured for {temp:?}"),
                })?;
            if !shelf.add(order)? {
                return Err(KitchenError::InvalidProcedure {
                    order_id,
                    detail: format!("temp shelf {temp:?} rejected placement"),
                });
            }
        }
        state.decay_timers.remove(&order_id);
        self.schedule_decay_timer_locked(state, order_id, lifetime, tx.clone());
        let placed = state.temp_shelves[temp].get(order_id).cloned().expect("just inserted");
        self.emit(state, &placed, EventType::AddedToShelf, Some(temp.to_string()), now, tx);
        Ok(())
    }

    fn place_on_overflow(
        &self,
        state: &mut KitchenState,
        order: Order,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let order_id = order.id;
        let lifetime = order.lifetime_remaining(now)?;
        if !state.overflow.add(order)? {
            return Err(KitchenError::InvalidProcedure {
                order_id,
                detail: "overflow shelf rejected placement".into(),
            });
        }
        state.decay_timers.remove(&order_id);
        self.schedule_decay_timer_locked(state, order_id, lifetime, tx.clone());
        let placed = state.overflow.get(order_id).cloned().expect("just inserted");
        let overflow_label = state.overflow.shelf_type.clone();
        self.emit(state, &placed, EventType::AddedToShelf, Some(overflow_label), now, tx);
        Ok(())
    }

    fn try_refill_from_overflow(
        &self,
        state: &mut KitchenState,
        temp: &str,
        removed: &Order,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let promoted_id = {
            let view = StateView(state);
            self.policy.on_order_removed(&view, removed, now)
        };
        let Some(pid) = promoted_id else { return Ok(()) };
        let mult = state
            .temp_shelves
            .get(temp)
            .map(|s| s.decay_rate_multiplier)
            .unwrap_or(1.0);
        let mut promoted = state.overflow.remove(pid).ok_or_else(|| KitchenError::InvalidProcedure {
            order_id: pid,
            detail: "promotion candidate vanished from overflow".into(),
        })?;
        promoted.update_decay_rate(now, promoted.decay_rate * mult)?;
        self.place_on_temp(state, promoted, temp, now, tx)
    }

    fn emit(
        &self,
        state: &mut KitchenState,
        order: &Order,
        event_type: EventType,
        shelf_type: Option<String>,
        now: f64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) {
        match event_type {
            EventType::PickedUp => state.tally.picked_up += 1,
            EventType::DecayedWaste => state.tally.decayed += 1,
            EventType::RemovedWaste => state.tally.removed += 1,
            EventType::AddedToShelf => {}
        }
        let shelves = ShelvesSnapshot {
            temp_shelves: state
                .temp_shelves
                .iter()
                .map(|(k, v)| (k.clone(), v.snapshot()))
                .collect(),
            overflow: state.overflow.snapshot(),
        };
        let event = OrderEvent {
            order: order.clone(),
            event_type,
            shelf_type,
            date: now,
            shelves,
        };
        let _ = tx.send(Ok(event));
    }

    fn schedule_decay_timer_locked(
        &self,
        state: &mut KitchenState,
        order_id: OrderId,
        lifetime_remaining: f64,
        tx: Sender<Result<OrderEvent, KitchenError>>,
    ) {
        let generation = state.next_generation;
        state.next_generation += 1;
        state.decay_timers.insert(order_id, generation);
        let sleep_for = self.duration_from_units(lifetime_remaining.max(0.0).ceil());
        let kitchen = self.clone();
        thread::spawn(move || {
            thread::sleep(sleep_for);
            kitchen.on_decay_timer_fired(order_id, generation, &tx);
        });
    }

    fn schedule_driver_timer_locked(
        &self,
        state: &mut KitchenState,
        order_id: OrderId,
        duration: f64,
        tx: Sender<Result<OrderEvent, KitchenError>>,
    ) {
        let generation = state.next_generation;
        state.next_generation += 1;
        state.driver_timers.insert(order_id, generation);
        let sleep_for = self.duration_from_units(duration);
        let kitchen = self.clone();
        thread::spawn(move || {
            thread::sleep(sleep_for);
            kitchen.on_driver_timer_fired(order_id, generation, &tx);
        });
    }

    fn on_decay_timer_fired(&self, order_id: OrderId, generation: u64, tx: &Sender<Result<OrderEvent, KitchenError>>) {
        if let Err(e) = self.decay_timer_fired_inner(order_id, generation, tx) {
            let _ = tx.send(Err(e));
        }
    }

    fn decay_timer_fired_inner(
        &self,
        order_id: OrderId,
        generation: u64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let mut state = self.state.lock().unwrap();
        if state.decay_timers.get(&order_id) != Some(&generation) {
            return Ok(()); // canceled or superseded
        }
        state.decay_timers.remove(&order_id);
        let now = self.clock.now();

        let Some((order, residency)) = state.remove_wherever(order_id) else {
            return Ok(()); // race: already picked up
        };
        state.driver_timers.remove(&order_id);

        let shelf_label = match &residency {
            Residency::Temp(t) => Some(t.clone()),
            Residency::Overflow => Some(state.overflow.shelf_type.clone()),
        };
        self.emit(&mut state, &order, EventType::DecayedWaste, shelf_label, now, tx);

        if let Residency::Temp(temp) = residency {
            self.try_refill_from_overflow(&mut state, &temp, &order, now, tx)?;
        }
        Ok(())
    }

    fn on_driver_timer_fired(&self, order_id: OrderId, generation: u64, tx: &Sender<Result<OrderEvent, KitchenError>>) {
        if let Err(e) = self.driver_timer_fired_inner(order_id, generation, tx) {
            let _ = tx.send(Err(e));
        }
    }

    fn driver_timer_fired_inner(
        &self,
        order_id: OrderId,
        generation: u64,
        tx: &Sender<Result<OrderEvent, KitchenError>>,
    ) -> Result<(), KitchenError> {
        let mut state = self.state.lock().unwrap();
        if state.driver_timers.get(&order_id) != Some(&generation) {
            return Ok(()); // canceled or superseded
        }
        state.driver_timers.remove(&order_id);
        let now = self.clock.now();

        let Some((order, residency)) = state.remove_wherever(order_id) else {
            return Ok(()); // race: order already gone (decayed or evicted)
        };
        state.decay_timers.remove(&order_id);

        let shelf_label = match &residency {
            Residency::Temp(t) => Some(t.clone()),
            Residency::Overflow => Some(state.overflow.shelf_type.clone()),
        };
        let fresh = order.freshness(now)?;
        // A late pickup whose decay timer's integer ceiling rounded
        // past the exact zero crossing resolves in favor of waste.
        let event_type = if fresh <= 0.0 {
            EventType::RemovedWaste
        } else {
            EventType::PickedUp
        };
        self.emit(&mut state, &order, event_type, shelf_label, now, tx);

        if let Residency::Temp(temp) = residency {
            self.try_refill_from_overflow(&mut state, &temp, &order, now, tx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::RandomDispatcher;
    use crate::policy::DefaultOverflowPolicy;
    use crate::source::{OrderSource, RawOrder, SourceError};

    struct FixedOrders(Vec<RawOrder>);
    impl OrderSource for FixedOrders {
        fn subscribe(&self) -> Box<dyn Iterator<Item = Result<RawOrder, SourceError>> + Send> {
            Box::new(self.0.clone().into_iter().map(Ok))
        }
    }

    fn config() -> KitchenConfig {
        KitchenConfig {
            time_unit: TimeUnit::Seconds,
            temp_shelves: vec![
                ShelfSpec { temp: "hot".into(), capacity: 1, multiplier: 1.0 },
                ShelfSpec { temp: "cold".into(), capacity: 1, multiplier: 1.0 },
                ShelfSpec { temp: "frozen".into(), capacity: 1, multiplier: 1.0 },
            ],
            overflow_capacity: 1,
            overflow_multiplier: 2.0,
        }
    }

    fn kitchen() -> Kitchen {
        Kitchen::new(
            config(),
            Arc::new(crate::clock::WallClock::new(TimeUnit::Seconds)),
            Arc::new(DefaultOverflowPolicy),
            Arc::new(RandomDispatcher::new(0, 0)),
        )
    }

    #[test]
    fn single_order_enough_capacity_is_added_then_picked_up() {
        let kitchen = kitchen();
        let source = FixedOrders(vec![RawOrder {
            name: "Banana Split".into(),
            temp: "frozen".into(),
            shelf_life: 20.0,
            decay_rate: 0.63,
        }]);
        let rx = kitchen.process_orders(&source);
        let events: Vec<_> = rx.into_iter().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::AddedToShelf);
        assert_eq!(events[0].shelf_type.as_deref(), Some("frozen"));
        assert_eq!(events[1].event_type, EventType::PickedUp);
        assert_eq!(kitchen.shelf("frozen").unwrap().len(), 0);
    }

    #[test]
    fn invalid_order_type_surfaces_as_stream_error() {
        let kitchen = kitchen();
        let source = FixedOrders(vec![RawOrder {
            name: "Mystery".into(),
            temp: "lukewarm".into(),
            shelf_life: 10.0,
            decay_rate: 0.1,
        }]);
        let rx = kitchen.process_orders(&source);
        let results: Vec<_> = rx.into_iter().collect();
        assert!(results.iter().any(|r| r.is_err()));
    }

    /// White-box tests for the decay/driver timer race (spec.md §4.5,
    /// scenarios 5-6): these call the private `*_fired_inner` handlers
    /// directly against a hand-placed order so the outcome doesn't
    /// depend on real thread scheduling.
    fn place_directly(kitchen: &Kitchen, order: Order, temp: &str) -> u64 {
        let mut state = kitchen.state.lock().unwrap();
        state.temp_shelves.get_mut(temp).unwrap().add(order).unwrap();
        let generation = state.next_generation;
        state.next_generation += 1;
        state.decay_timers.insert(1, generation);
        state.driver_timers.insert(1, generation);
        generation
    }

    #[test]
    fn decay_timer_fired_removes_order_and_driver_then_finds_nothing() {
        let kitchen = kitchen();
        let (tx, rx) = mpsc::channel();
        let mut order = Order::new(1, "Ice Cube", "frozen", 30.0, 0.0, TimeUnit::Seconds);
        order.initialize(0.0);
        let generation = place_directly(&kitchen, order, "frozen");

        kitchen.decay_timer_fired_inner(1, generation, &tx).unwrap();
        let event = rx.recv().unwrap().unwrap();
        assert_eq!(event.event_type, EventType::DecayedWaste);
        assert_eq!(event.shelf_type.as_deref(), Some("frozen"));

        // The driver timer entry was canceled by the decay removal;
        // firing it now with the stale generation is a no-op.
        kitchen.driver_timer_fired_inner(1, generation, &tx).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn driver_arrival_after_zero_crossing_is_waste_not_pickup() {
        let kitchen = kitchen();
        let (tx, rx) = mpsc::channel();
        // shelf_life=1, decay_rate=0: freshness hits zero at age 1, but
        // the decay timer (scheduled separately) hasn't fired yet —
        // the driver arrives late and must still resolve to waste.
        let mut order = Order::new(1, "Stale Roll", "hot", 1.0, 0.0, TimeUnit::Seconds);
        order.initialize(0.0);
        let generation = place_directly(&kitchen, order, "hot");

        // Advance the coordinator's own clock past the zero crossing by
        // using a kitchen built on a FixedClock for this assertion.
        let fixed_kitchen = Kitchen {
            clock: Arc::new(crate::clock::FixedClock::new(5.0)),
            ..kitchen.clone()
        };
        fixed_kitchen
            .driver_timer_fired_inner(1, generation, &tx)
            .unwrap();
        let event = rx.recv().unwrap().unwrap();
        assert_eq!(event.event_type, EventType::RemovedWaste);
        assert_eq!(event.shelf_type.as_deref(), Some("hot"));
    }
}
