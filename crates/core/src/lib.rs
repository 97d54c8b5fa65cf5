//! Coach core data models.
//!
//! This crate defines the values that flow through one governed tuning run:
//! the immutable law, the lane's style, the shadow metrics, the verdict and
//! the sealed receipt.

#![warn(missing_docs)]

// Identity
mod lane;

// Policy and tunables
mod law;
mod style;

// Run products
mod metrics;
mod verdict;
mod receipt;

// Inputs
mod history;

pub use lane::LaneId;
pub use law::{Law, Constraints, Benchmark, ExceptionPolicy};
pub use style::{Style, StyleBounds, Bound, ReflexAction};
pub use metrics::{Metrics, MetricCeilings};
pub use verdict::{Verdict, Judgement};
pub use receipt::{Receipt, ReceiptDraft, Coherence, Band, ReceiptMetrics, Policy, Stamp, canonical_digest};
pub use history::{HistoryEvent, HistorySource, History};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while validating or sealing core values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A style field left its documented range
    #[error("style field `{field}` = {value} outside [{min}, {max}]")]
    OutOfBounds {
        /// Field name
        field: &'static str,
        /// Observed value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// `reflex_order` is not a permutation of the fixed action set
    #[error("reflex_order {0:?} is not a permutation of the action set")]
    NotAPermutation(Vec<ReflexAction>),

    /// Lane identifier is unusable as a path segment
    #[error("invalid lane id: {0:?}")]
    InvalidLane(String),

    /// Canonical serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Round to a fixed number of decimals.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
