//! `OrderSource`: a lazy, finite, restartable-per-subscription stream
//! of raw order records (spec.md §4.6, §6). The engine's only
//! concrete source reads a JSON array from a file and paces emission
//! as a Poisson process.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::order::TimeUnit;

#[derive(Debug, Clone, Deserialize)]
pub struct RawOrder {
    pub name: String,
    pub temp: String,
    #[serde(rename = "shelfLife")]
    pub shelf_life: f64,
    #[serde(rename = "decayRate")]
    pub decay_rate: f64,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read orders file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed orders document in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Produces a cold, restartable-per-subscription sequence of
/// `RawOrder`s. Emission rate and storage format are out of scope
/// per spec.md §1; this crate's only concrete source is the JSON file
/// reader below.
pub trait OrderSource: Send {
    fn subscribe(&self) -> Box<dyn Iterator<Item = Result<RawOrder, SourceError>> + Send>;
}

/// Reads a top-level JSON array of order records and emits them with
/// Poisson-distributed interarrival delays at the configured average
/// rate (orders per time unit).
pub struct JsonFileSource {
    path: PathBuf,
    average_rate: f64,
    time_unit: TimeUnit,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>, average_rate: f64, time_unit: TimeUnit) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            average_rate,
            time_unit,
        }
    }

    fn load(&self) -> Result<Vec<RawOrder>, SourceError> {
        let path_str = self.path.display().to_string();
        let text = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: path_str.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SourceError::Parse {
            path: path_str,
            source,
        })
    }
}

impl OrderSource for JsonFileSource {
    fn subscribe(&self) -> Box<dyn Iterator<Item = Result<RawOrder, SourceError>> + Send> {
        match self.load() {
            Ok(orders) => Box::new(PoissonPaced {
                orders: orders.into_iter(),
                average_rate: self.average_rate,
                time_unit: self.time_unit,
                first: true,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}

struct PoissonPaced {
    orders: std::vec::IntoIter<RawOrder>,
    average_rate: f64,
    time_unit: TimeUnit,
    first: bool,
}

impl PoissonPaced {
    fn interarrival_delay(&self) -> Duration {
        if self.average_rate <= 0.0 {
            return Duration::ZERO;
        }
        // Inverse-CDF sampling of Exp(average_rate): gap ~ -ln(1-u)/rate.
        let u: f64 = rand::rng().random_range(0.0..1.0);
        let time_units = -(1.0 - u).ln() / self.average_rate;
        match self.time_unit {
            TimeUnit::Seconds => Duration::from_secs_f64(time_units.max(0.0)),
            TimeUnit::Milliseconds => Duration::from_secs_f64((time_units / 1_000.0).max(0.0)),
        }
    }
}

impl Iterator for PoissonPaced {
    type Item = Result<RawOrder, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.orders.next()?;
        if self.first {
            self.first = false;
        } else {
            thread::sleep(self.interarrival_delay());
        }
        Some(Ok(next))
    }
}
