//! Storage abstraction and implementations for Coach.
//!
//! This crate provides a trait-based storage interface with a JSON file
//! reference implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod layout;
pub mod json_storage;

pub use trait_::{Storage, StorageError, Result, LawDocument, ReceiptPaths};
pub use layout::StorageLayout;
pub use json_storage::JsonStorage;
