//! Crate-wide error taxonomy (spec.md §7). `NotInitialized` and
//! `InvalidOrderType` bubble up from `order`/`shelf`; `InvalidProcedure`
//! and `CloneFailure` are raised directly by the coordinator.

use thiserror::Error;

use crate::order::{OrderError, OrderId};
use crate::shelf::ShelfError;
use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum KitchenError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Shelf(#[from] ShelfError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// The overflow policy returned an instruction the coordinator
    /// cannot execute — e.g. told to remove an order no longer on any
    /// shelf, or to add to a shelf that is already full. A faulty
    /// policy is not correctable at runtime; this halts the stream.
    #[error("policy returned an infeasible instruction for order {order_id}: {detail}")]
    InvalidProcedure { order_id: OrderId, detail: String },

    /// Deep-copy snapshot failed. Unreachable with the current
    /// `derive(Clone)`-based snapshot (Rust's `Clone` is infallible),
    /// kept for the error taxonomy and for any future snapshot source
    /// that performs fallible I/O.
    #[error("failed to snapshot shelves for order {order_id}")]
    CloneFailure { order_id: OrderId },
}
