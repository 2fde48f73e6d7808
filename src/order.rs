//! `Order` identity, shelf-life parameters, and the mutable decay
//! anchor that lets freshness stay continuous across shelf moves.

use thiserror::Error;

use crate::decay;

pub type OrderId = u64;

/// Resolution the shelf-life/decay-rate numbers are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "second" | "seconds" | "sec" | "s" => Ok(TimeUnit::Seconds),
            "millisecond" | "milliseconds" | "ms" => Ok(TimeUnit::Milliseconds),
            other => Err(format!("unknown time unit: {other}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {0} queried for decay before initialize() was called")]
    NotInitialized(OrderId),
}

/// The mutable `{addedToShelfDate, currentDecayRate, adjustedShelfLife}`
/// triple described in spec.md §3. Updated atomically by
/// `Order::update_decay_rate`.
#[derive(Debug, Clone, Copy)]
struct DecayAnchor {
    added_to_shelf_date: f64,
    current_decay_rate: f64,
    adjusted_shelf_life: f64,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub temp: String,
    pub shelf_life: f64,
    pub decay_rate: f64,
    pub time_unit: TimeUnit,
    birth_date: Option<f64>,
    anchor: Option<DecayAnchor>,
}

impl Order {
    pub fn new(
        id: OrderId,
        name: impl Into<String>,
        temp: impl Into<String>,
        shelf_life: f64,
        decay_rate: f64,
        time_unit: TimeUnit,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            temp: temp.into(),
            shelf_life,
            decay_rate,
            time_unit,
            birth_date: None,
            anchor: None,
        }
    }

    /// Must be called once, before any decay query, at the order's
    /// first placement.
    pub fn initialize(&mut self, now: f64) {
        self.birth_date = Some(now);
        self.anchor = Some(DecayAnchor {
            added_to_shelf_date: now,
            current_decay_rate: self.decay_rate,
            adjusted_shelf_life: self.shelf_life,
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.anchor.is_some()
    }

    fn anchor(&self) -> Result<&DecayAnchor, OrderError> {
        self.anchor.as_ref().ok_or(OrderError::NotInitialized(self.id))
    }

    pub fn current_decay_rate(&self) -> Result<f64, OrderError> {
        Ok(self.anchor()?.current_decay_rate)
    }

    pub fn freshness(&self, now: f64) -> Result<f64, OrderError> {
        let a = self.anchor()?;
        Ok(decay::freshness(
            a.adjusted_shelf_life,
            a.current_decay_rate,
            now - a.added_to_shelf_date,
        ))
    }

    /// Denominator is the original shelf life, not the adjusted one —
    /// this is what gets reported to the display.
    pub fn normalized_freshness(&self, now: f64) -> Result<f64, OrderError> {
        Ok(self.freshness(now)? / self.shelf_life)
    }

    pub fn lifetime_remaining(&self, now: f64) -> Result<f64, OrderError> {
        let a = self.anchor()?;
        let remaining =
            decay::lifetime(a.adjusted_shelf_life, a.current_decay_rate) - (now - a.added_to_shelf_date);
        Ok(remaining.max(0.0))
    }

    /// The continuity rule: freshness at `now` is unchanged by this
    /// call; only the slope for subsequent time changes.
    pub fn update_decay_rate(&mut self, now: f64, new_rate: f64) -> Result<(), OrderError> {
        let fresh = self.freshness(now)?;
        self.anchor = Some(DecayAnchor {
            added_to_shelf_date: now,
            current_decay_rate: new_rate,
            adjusted_shelf_life: fresh,
        });
        Ok(())
    }

    pub fn birth_date(&self) -> Option<f64> {
        self.birth_date
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Order {}

impl std::hash::Hash for Order {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
