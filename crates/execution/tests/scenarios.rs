//! End-to-end tuning runs against a JSON storage root.

use chrono::TimeZone;
use coach_core::{LaneId, Receipt, Style, Verdict};
use coach_execution::{RunOutcome, TuningEngine};
use coach_quality::LAW_INTEGRITY_REASON;
use coach_storage::{JsonStorage, Storage};
use tempfile::TempDir;

const LOOSE_LAW: &str = r#"{
    "version": "test-loose",
    "constraints": {"no_threshold_edits_by_style": true},
    "benchmark": {"max_false_green": 0.20, "max_flap_index": 0.40, "target_recovery_halflife": 10},
    "exception": {"target_rate": 0.20}
}"#;

const UNSEALED_LAW: &str = r#"{
    "constraints": {"no_threshold_edits_by_style": false},
    "benchmark": {"max_false_green": 0.20, "max_flap_index": 0.40, "target_recovery_halflife": 10},
    "exception": {"target_rate": 0.20}
}"#;

const STRICT_FALSE_GREEN_LAW: &str = r#"{
    "constraints": {"no_threshold_edits_by_style": true},
    "benchmark": {"max_false_green": 0.05, "max_flap_index": 0.40, "target_recovery_halflife": 10},
    "exception": {"target_rate": 0.20}
}"#;

fn lane() -> LaneId {
    LaneId::new("lane1").unwrap()
}

async fn setup(law: &str, style: Option<&Style>) -> (TempDir, JsonStorage) {
    let dir = TempDir::new().unwrap();
    let mut storage = JsonStorage::new(dir.path()).await.unwrap();

    let law_path = storage.layout().law_path();
    tokio::fs::create_dir_all(law_path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&law_path, law).await.unwrap();

    if let Some(style) = style {
        storage.save_style(&lane(), style).await.unwrap();
    }
    (dir, storage)
}

async fn run(law: &str, style: Option<&Style>, seed: u64) -> (TempDir, JsonStorage, RunOutcome) {
    let (dir, storage) = setup(law, style).await;
    let mut engine = TuningEngine::new(storage, lane()).with_seed(seed);
    let at = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let outcome = engine.run_at(at).await.unwrap();

    let storage = JsonStorage::new(dir.path()).await.unwrap();
    (dir, storage, outcome)
}

#[tokio::test]
async fn scenario_a_default_style_loose_law_adopts() {
    for seed in 0..8 {
        let (_dir, storage, outcome) = run(LOOSE_LAW, None, seed).await;

        assert_eq!(outcome.verdict, Verdict::Accepted, "seed {}: {:?}", seed, outcome.reasons);
        assert!(outcome.reasons.is_empty());
        assert!(outcome.committed);
        assert_eq!(outcome.old, Style::conservative());
        assert_eq!(outcome.receipt.status, "OK");
        assert_eq!(outcome.receipt.so, "adopted");

        let stored = storage.load_style(&lane()).await.unwrap().unwrap();
        assert_eq!(stored, outcome.new);
    }
}

#[tokio::test]
async fn scenario_b_unsealed_law_rejects() {
    let prior = Style { smoothing: 0.25, ..Style::conservative() };
    for seed in 0..8 {
        let (_dir, storage, outcome) = run(UNSEALED_LAW, Some(&prior), seed).await;

        assert_eq!(outcome.verdict, Verdict::Rejected);
        assert!(!outcome.committed);
        assert_eq!(outcome.reasons[0], LAW_INTEGRITY_REASON);
        assert_eq!(outcome.receipt.status, "ERROR");
        assert_eq!(outcome.receipt.so, "rejected");
        assert!(outcome.receipt.but.contains(LAW_INTEGRITY_REASON));

        let stored = storage.load_style(&lane()).await.unwrap().unwrap();
        assert_eq!(stored, prior);
    }
}

#[tokio::test]
async fn scenario_c_max_forgiveness_strict_law_rejects_false_green() {
    let loose = Style { forgiveness: 0.30, ..Style::conservative() };
    for seed in 0..8 {
        let (_dir, storage, outcome) = run(STRICT_FALSE_GREEN_LAW, Some(&loose), seed).await;

        assert_eq!(outcome.verdict, Verdict::Rejected);
        assert!(outcome.reasons.iter().any(|r| r.starts_with("false_green ")), "{:?}", outcome.reasons);
        assert_eq!(storage.load_style(&lane()).await.unwrap().unwrap(), loose);

        // Same seed, conservative start: the forgiving lane scores worse.
        let (_d, _s, baseline) = run(LOOSE_LAW, None, seed).await;
        assert!(outcome.metrics.false_green > baseline.metrics.false_green);
        assert!(outcome.metrics.exception_rate > baseline.metrics.exception_rate);
    }
}

#[tokio::test]
async fn receipt_is_reproducible_and_self_verifying() {
    let (_a, storage_a, first) = run(LOOSE_LAW, None, 99).await;
    let (_b, _storage_b, second) = run(LOOSE_LAW, None, 99).await;

    let doc_a = tokio::fs::read_to_string(&first.receipt_paths.lane).await.unwrap();
    let doc_b = tokio::fs::read_to_string(&second.receipt_paths.lane).await.unwrap();
    assert_eq!(doc_a, doc_b);

    let latest = tokio::fs::read_to_string(&first.receipt_paths.latest).await.unwrap();
    assert_eq!(doc_a, latest);
    assert!(Receipt::verify_document(&doc_a).unwrap());

    let parsed: Receipt = serde_json::from_str(&doc_a).unwrap();
    assert_eq!(parsed, first.receipt);
    assert!(parsed.verify_digest().unwrap());

    let mirror = tokio::fs::read_to_string(storage_a.layout().law_mirror_path()).await.unwrap();
    assert_eq!(mirror, LOOSE_LAW);
}

#[tokio::test]
async fn malformed_style_file_is_fatal() {
    let (dir, storage) = setup(LOOSE_LAW, None).await;
    let style_path = storage.layout().style_path(&lane());
    tokio::fs::create_dir_all(style_path.parent().unwrap()).await.unwrap();
    tokio::fs::write(
        &style_path,
        r#"{"forgiveness": 0.1, "smoothing": 0.2, "reflex_order": ["rollback"], "vkd_discount": 0.5}"#,
    )
    .await
    .unwrap();

    let mut engine = TuningEngine::new(storage, lane()).with_seed(1);
    assert!(engine.run().await.is_err());
    assert!(!dir.path().join("docs").join("receipt.latest.json").exists());
}

#[tokio::test]
async fn history_does_not_change_the_outcome() {
    let (_a, _sa, without) = run(LOOSE_LAW, None, 5).await;

    let (dir, storage) = setup(LOOSE_LAW, None).await;
    let history_path = storage.layout().history_path(&lane());
    tokio::fs::create_dir_all(history_path.parent().unwrap()).await.unwrap();
    tokio::fs::write(&history_path, "{\"band\":\"red\"}\n{\"band\":\"green\"}\n").await.unwrap();
    let mut engine = TuningEngine::new(storage, lane()).with_seed(5);
    let with = engine
        .run_at(chrono::Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
        .await
        .unwrap();
    drop(dir);

    assert_eq!(with.metrics, without.metrics);
    assert_eq!(with.receipt.digest(), without.receipt.digest());
}
