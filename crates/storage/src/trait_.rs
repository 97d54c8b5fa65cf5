//! Storage trait abstraction.

use std::path::PathBuf;
use async_trait::async_trait;
use coach_core::{History, LaneId, Law, Receipt, Style};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A style file exists but is unusable
    #[error("invalid style at {path}: {reason}")]
    InvalidStyle {
        /// Style file
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// A core value could not be produced
    #[error(transparent)]
    Core(#[from] coach_core::CoreError),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// The law as found on disk.
#[derive(Debug)]
pub struct LawDocument {
    /// Raw text, mirrored verbatim for audit
    pub raw: String,
    /// Parsed law, or why it could not be parsed
    pub parsed: std::result::Result<Law, serde_json::Error>,
}

/// Where a receipt was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPaths {
    /// Lane-specific latest tuning receipt
    pub lane: PathBuf,
    /// Most recent receipt across all lanes
    pub latest: PathBuf,
    /// Append-only archive copy, when archiving is on
    pub archive: Option<PathBuf>,
}

/// Storage abstraction for lane state and the audit trail.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Law ===

    /// Read the law document. A missing document is an error.
    async fn load_law(&self) -> Result<LawDocument>;

    /// Copy the law text next to the receipts.
    async fn mirror_law(&mut self, raw: &str) -> Result<PathBuf>;

    // === Style store ===

    /// Load a lane's style, `None` if the lane has none yet.
    async fn load_style(&self, lane: &LaneId) -> Result<Option<Style>>;

    /// Replace a lane's style.
    async fn save_style(&mut self, lane: &LaneId, style: &Style) -> Result<()>;

    // === History ===

    /// Load a lane's history, empty if there is none.
    async fn load_history(&self, lane: &LaneId) -> Result<History>;

    // === Receipts ===

    /// Persist a receipt to every receipt location, all or nothing.
    async fn write_receipt(&mut self, lane: &LaneId, receipt: &Receipt) -> Result<ReceiptPaths>;
}
