//! On-disk layout of a coach root.

use std::path::{Path, PathBuf};
use coach_core::LaneId;

/// Maps lanes to the files that hold their state.
///
/// ```text
/// canon/law.json                        law document
/// adapters/<lane>/style.json            style store
/// data/<lane>/history.jsonl             history log
/// docs/receipts/<lane>/tuning.json      lane receipt
/// docs/receipts/<lane>/archive/*.json   archived receipts
/// docs/receipts/canon.json              law mirror
/// docs/receipt.latest.json              latest receipt, any lane
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Law document.
    pub fn law_path(&self) -> PathBuf {
        self.root.join("canon").join("law.json")
    }

    /// Style store for a lane.
    pub fn style_path(&self, lane: &LaneId) -> PathBuf {
        self.root.join("adapters").join(lane.as_str()).join("style.json")
    }

    /// History log for a lane.
    pub fn history_path(&self, lane: &LaneId) -> PathBuf {
        self.root.join("data").join(lane.as_str()).join("history.jsonl")
    }

    /// Directory holding all receipts.
    pub fn receipts_dir(&self) -> PathBuf {
        self.root.join("docs").join("receipts")
    }

    /// Latest tuning receipt for a lane.
    pub fn lane_receipt_path(&self, lane: &LaneId) -> PathBuf {
        self.receipts_dir().join(lane.as_str()).join("tuning.json")
    }

    /// Archive directory for a lane.
    pub fn archive_dir(&self, lane: &LaneId) -> PathBuf {
        self.receipts_dir().join(lane.as_str()).join("archive")
    }

    /// Most recent receipt across lanes.
    pub fn latest_receipt_path(&self) -> PathBuf {
        self.root.join("docs").join("receipt.latest.json")
    }

    /// Mirrored law document.
    pub fn law_mirror_path(&self) -> PathBuf {
        self.receipts_dir().join("canon.json")
    }
}
