//! Execution layer - one governed tuning run, end to end.

#![warn(missing_docs)]

pub mod receipt;
pub mod engine;

pub use receipt::{ReceiptWriter, RECEIPT_TITLE, RECEIPT_POINT};
pub use engine::{TuningEngine, EngineConfig, RunOutcome};
