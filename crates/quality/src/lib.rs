//! Quality Assurance
//!
//! Judges shadow metrics against the law.

#![warn(missing_docs)]

pub mod judge;

pub use judge::{Judge, Rule, LAW_INTEGRITY_REASON, MALFORMED_LAW_PREFIX};
