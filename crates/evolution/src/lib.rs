//! Evolution layer - bounded style proposals and shadow evaluation.

#![warn(missing_docs, unused_crate_dependencies)]

mod proposer;
mod shadow;

pub use proposer::{Proposer, ProposerConfig};
pub use shadow::ShadowSimulator;
