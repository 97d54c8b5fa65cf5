//! JSON file storage implementation.
//!
//! Keeps the law, per-lane styles and histories, and the receipt trail as
//! plain JSON files under a root directory (see [`StorageLayout`]). Every
//! write goes to a `.tmp` sibling first and is renamed into place, so readers
//! never observe a half-written file.
//!
//! A receipt fans out to several copies. If any rename fails, copies already
//! renamed are put back from a `.bak` sibling (or removed when they are new)
//! and leftover `.tmp` files are deleted, so the trail never disagrees.

use std::path::{Path, PathBuf};
use coach_core::{History, HistoryEvent, LaneId, Receipt, Style};
use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;
use super::{LawDocument, ReceiptPaths, Result, Storage, StorageError, StorageLayout};

/// File-based JSON storage backend.
pub struct JsonStorage {
    layout: StorageLayout,
    archive: bool,
}

impl JsonStorage {
    /// Create storage rooted at `root`. This creates the receipt directory but
    /// never writes a law or style on its own.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let layout = StorageLayout::new(root);
        let receipts = layout.receipts_dir();
        fs::create_dir_all(&receipts).await.map_err(|e| StorageError::io(&receipts, e))?;

        Ok(Self { layout, archive: true })
    }

    /// Enable or disable the append-only receipt archive.
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    /// The layout this storage writes to.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn load_law(&self) -> Result<LawDocument> {
        let path = self.layout.law_path();
        let raw = fs::read_to_string(&path).await.map_err(|e| StorageError::io(&path, e))?;
        let parsed = serde_json::from_str(&raw);
        Ok(LawDocument { raw, parsed })
    }

    async fn mirror_law(&mut self, raw: &str) -> Result<PathBuf> {
        let path = self.layout.law_mirror_path();
        write_atomic(&path, raw.as_bytes()).await?;
        Ok(path)
    }

    async fn load_style(&self, lane: &LaneId) -> Result<Option<Style>> {
        let path = self.layout.style_path(lane);
        let Some(text) = read_optional(&path).await? else {
            return Ok(None);
        };

        let style: Style = serde_json::from_str(&text).map_err(|e| StorageError::InvalidStyle {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        style.validate().map_err(|e| StorageError::InvalidStyle {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(style))
    }

    async fn save_style(&mut self, lane: &LaneId, style: &Style) -> Result<()> {
        style.validate()?;
        let path = self.layout.style_path(lane);
        let json = serde_json::to_string_pretty(style)?;
        write_atomic(&path, json.as_bytes()).await?;
        debug!("Saved style for {} to {}", lane, path.display());
        Ok(())
    }

    async fn load_history(&self, lane: &LaneId) -> Result<History> {
        let path = self.layout.history_path(lane);
        let Some(text) = read_optional(&path).await? else {
            return Ok(History::empty());
        };

        let mut events = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping history line {} of {}: {}", n + 1, path.display(), e),
            }
        }
        Ok(History::new(events))
    }

    async fn write_receipt(&mut self, lane: &LaneId, receipt: &Receipt) -> Result<ReceiptPaths> {
        let doc = receipt.to_document()?;

        let paths = ReceiptPaths {
            lane: self.layout.lane_receipt_path(lane),
            latest: self.layout.latest_receipt_path(),
            archive: self
                .archive
                .then(|| self.layout.archive_dir(lane).join(format!("{}.json", Ulid::new()))),
        };

        let mut targets = vec![paths.lane.clone(), paths.latest.clone()];
        targets.extend(paths.archive.clone());

        // Stage every copy before any of them becomes visible.
        let mut staged = Vec::with_capacity(targets.len());
        for target in &targets {
            match stage(target, doc.as_bytes()).await {
                Ok(tmp) => staged.push((tmp, target)),
                Err(e) => {
                    for (tmp, _) in &staged {
                        let _ = fs::remove_file(tmp).await;
                    }
                    return Err(e);
                }
            }
        }

        let mut backups = Vec::with_capacity(staged.len());
        for (_, target) in &staged {
            match back_up(target).await {
                Ok(backup) => backups.push(backup),
                Err(e) => {
                    for (tmp, _) in &staged {
                        let _ = fs::remove_file(tmp).await;
                    }
                    for backup in backups.iter().flatten() {
                        let _ = fs::remove_file(backup).await;
                    }
                    return Err(e);
                }
            }
        }

        for (i, (tmp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, target).await {
                warn!("Publishing receipt to {} failed, rolling back: {}", target.display(), e);
                for ((_, done), backup) in staged[..i].iter().zip(&backups) {
                    let _ = match backup {
                        Some(backup) => fs::rename(backup, done).await,
                        None => fs::remove_file(done).await,
                    };
                }
                for (tmp, _) in &staged[i..] {
                    let _ = fs::remove_file(tmp).await;
                }
                for backup in backups[i..].iter().flatten() {
                    let _ = fs::remove_file(backup).await;
                }
                return Err(StorageError::io(*target, e));
            }
        }

        for backup in backups.iter().flatten() {
            let _ = fs::remove_file(backup).await;
        }
        Ok(paths)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

async fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| StorageError::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).await.map_err(|e| StorageError::io(&tmp, e))?;
    Ok(tmp)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = stage(path, bytes).await?;
    fs::rename(&tmp, path).await.map_err(|e| StorageError::io(path, e))
}

/// Copy an existing file to its `.bak` sibling. Returns `None` when there is
/// no file to preserve.
async fn back_up(path: &Path) -> Result<Option<PathBuf>> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {
            let backup = sibling(path, ".bak");
            fs::copy(path, &backup).await.map_err(|e| StorageError::io(&backup, e))?;
            Ok(Some(backup))
        }
        _ => Ok(None),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coach_core::{Band, Coherence, Metrics, Policy, ReceiptDraft, ReceiptMetrics, Verdict, HistorySource};
    use tempfile::TempDir;

    const LAW: &str = r#"{
        "constraints": {"no_threshold_edits_by_style": true},
        "benchmark": {"max_false_green": 0.2, "max_flap_index": 0.4, "target_recovery_halflife": 10},
        "exception": {"target_rate": 0.2}
    }"#;

    fn lane() -> LaneId {
        LaneId::new("lane1").unwrap()
    }

    fn receipt() -> Receipt {
        let draft = ReceiptDraft {
            title: "Tuning Receipt".to_string(),
            status: "OK".to_string(),
            lane: lane(),
            verdict: Verdict::Accepted,
            point: "test".to_string(),
            because: Vec::new(),
            but: String::new(),
            so: "adopted".to_string(),
            reasons: Vec::new(),
            metrics: ReceiptMetrics {
                coherence: Coherence { band: Band::Green },
                shadow: Metrics::bounded(0.01, 0.02, 2.0, 0.01),
            },
            policy: Policy::default(),
        };
        Receipt::seal(draft, chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap()
    }

    async fn write(path: PathBuf, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, text).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_style_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        assert!(storage.load_style(&lane()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_style_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let style = Style { forgiveness: 0.12, ..Style::conservative() };

        storage.save_style(&lane(), &style).await.unwrap();
        let loaded = storage.load_style(&lane()).await.unwrap().unwrap();
        assert_eq!(loaded, style);
        assert!(!tmp_path(&storage.layout().style_path(&lane())).exists());
    }

    #[tokio::test]
    async fn test_out_of_bounds_style_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        write(
            storage.layout().style_path(&lane()),
            r#"{"forgiveness": 0.9, "smoothing": 0.2, "reflex_order": ["rollback","rules_first","retune"], "vkd_discount": 0.5}"#,
        ).await;

        let err = storage.load_style(&lane()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidStyle { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_style_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        write(storage.layout().style_path(&lane()), "{not json").await;

        assert!(matches!(
            storage.load_style(&lane()).await,
            Err(StorageError::InvalidStyle { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_law_is_io_error() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        assert!(matches!(storage.load_law().await, Err(StorageError::Io { .. })));
    }

    #[tokio::test]
    async fn test_malformed_law_keeps_raw_text() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        write(storage.layout().law_path(), "{\"constraints\": ").await;

        let doc = storage.load_law().await.unwrap();
        assert!(doc.parsed.is_err());
        assert_eq!(doc.raw, "{\"constraints\": ");
    }

    #[tokio::test]
    async fn test_law_loads_and_mirrors() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        write(storage.layout().law_path(), LAW).await;

        let doc = storage.load_law().await.unwrap();
        assert!(doc.parsed.unwrap().is_sealed());

        let mirror = storage.mirror_law(&doc.raw).await.unwrap();
        assert_eq!(fs::read_to_string(mirror).await.unwrap(), LAW);
    }

    #[tokio::test]
    async fn test_history_skips_bad_lines() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        assert!(storage.load_history(&lane()).await.unwrap().is_empty());

        write(
            storage.layout().history_path(&lane()),
            "{\"band\":\"green\"}\n\nnot json\n{\"band\":\"red\"}\n",
        ).await;
        let history = storage.load_history(&lane()).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_copies_are_identical() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let receipt = receipt();

        let paths = storage.write_receipt(&lane(), &receipt).await.unwrap();
        let lane_doc = fs::read_to_string(&paths.lane).await.unwrap();
        let latest_doc = fs::read_to_string(&paths.latest).await.unwrap();
        let archive_doc = fs::read_to_string(paths.archive.as_ref().unwrap()).await.unwrap();

        assert_eq!(lane_doc, latest_doc);
        assert_eq!(lane_doc, archive_doc);
        assert_eq!(lane_doc, receipt.to_document().unwrap());
        assert!(Receipt::verify_document(&lane_doc).unwrap());
    }

    #[tokio::test]
    async fn test_archive_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap().with_archive(false);

        let paths = storage.write_receipt(&lane(), &receipt()).await.unwrap();
        assert!(paths.archive.is_none());
        assert!(!storage.layout().archive_dir(&lane()).exists());
    }

    fn leftovers(root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut dirs = vec![root.to_path_buf()];
        while let Some(dir) = dirs.pop() {
            for entry in std::fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    dirs.push(path);
                } else if matches!(path.extension().and_then(|e| e.to_str()), Some("tmp" | "bak")) {
                    found.push(path);
                }
            }
        }
        found
    }

    #[tokio::test]
    async fn test_failed_receipt_write_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        // A directory where the latest receipt belongs makes that rename fail.
        fs::create_dir_all(storage.layout().latest_receipt_path()).await.unwrap();

        let err = storage.write_receipt(&lane(), &receipt()).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!storage.layout().lane_receipt_path(&lane()).exists());
        assert!(storage.layout().latest_receipt_path().is_dir());
        assert!(leftovers(dir.path()).is_empty(), "{:?}", leftovers(dir.path()));
    }

    #[tokio::test]
    async fn test_failed_receipt_write_restores_previous_copy() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let lane_path = storage.layout().lane_receipt_path(&lane());
        write(lane_path.clone(), "{\"previous\": true}").await;
        fs::create_dir_all(storage.layout().latest_receipt_path()).await.unwrap();

        assert!(storage.write_receipt(&lane(), &receipt()).await.is_err());
        assert_eq!(fs::read_to_string(&lane_path).await.unwrap(), "{\"previous\": true}");
        assert!(leftovers(dir.path()).is_empty(), "{:?}", leftovers(dir.path()));
    }

    #[tokio::test]
    async fn test_receipt_overwrite_leaves_no_backups() {
        let dir = TempDir::new().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        storage.write_receipt(&lane(), &receipt()).await.unwrap();
        storage.write_receipt(&lane(), &receipt()).await.unwrap();
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        assert_eq!(
            tmp_path(Path::new("/a/b/tuning.json")),
            PathBuf::from("/a/b/tuning.json.tmp")
        );
    }
}
