//! The event stream emitted by the kitchen coordinator (spec.md §3,
//! §6): one record per shelf mutation or terminal pickup/waste, each
//! carrying a frozen snapshot of every shelf at emission time.

use std::collections::HashMap;

use crate::order::Order;
use crate::shelf::Shelf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    AddedToShelf,
    PickedUp,
    DecayedWaste,
    RemovedWaste,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::AddedToShelf => "AddedToShelf",
            EventType::PickedUp => "PickedUp",
            EventType::DecayedWaste => "DecayedWaste",
            EventType::RemovedWaste => "RemovedWaste",
        };
        f.write_str(s)
    }
}

/// Deep-copy view of every shelf (temperature shelves plus overflow)
/// at the moment an event was emitted.
#[derive(Debug, Clone)]
pub struct ShelvesSnapshot {
    pub temp_shelves: HashMap<String, Shelf>,
    pub overflow: Shelf,
}

#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub order: Order,
    pub event_type: EventType,
    /// `None` when the incoming order is discarded without ever being
    /// placed on a shelf.
    pub shelf_type: Option<String>,
    pub date: f64,
    pub shelves: ShelvesSnapshot,
}
