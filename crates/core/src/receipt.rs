//! Receipt model - the sealed audit record of one tuning run.
//!
//! A receipt is assembled as a [`ReceiptDraft`], then sealed: the draft is
//! rendered with an empty digest, that rendering is hashed, and a new
//! [`Receipt`] is built carrying the digest. The digest therefore covers every
//! field, including `issued_at`, and a verifier recomputes it by blanking
//! `stamp.digest_sha256` and hashing again.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use crate::{LaneId, Metrics, Time, Verdict};

/// Coherence band shown on the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// Run adopted its proposal
    Green,
    /// Run rejected its proposal
    Red,
}

/// Coherence summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coherence {
    /// Band
    pub band: Band,
}

/// Metrics block of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMetrics {
    /// Coherence band
    pub coherence: Coherence,
    /// Shadow metrics the judge saw
    pub shadow: Metrics,
}

/// Usage policy flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Intended use
    #[serde(rename = "use")]
    pub usage: String,
    /// Whether the receipt may be shared
    pub share: String,
    /// Whether the receipt may be used for training
    pub train: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            usage: "demo".to_string(),
            share: "yes".to_string(),
            train: "yes".to_string(),
        }
    }
}

/// Issuance stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// When the receipt was issued
    pub issued_at: Time,
    /// Hex SHA-256 over the receipt with this field blank
    pub digest_sha256: String,
}

/// Everything a receipt says, before it is stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDraft {
    /// Title
    pub title: String,
    /// `OK` or `ERROR`
    pub status: String,
    /// Lane the run tuned
    pub lane: LaneId,
    /// Verdict
    pub verdict: Verdict,
    /// What the pipeline does
    pub point: String,
    /// Evidence strings
    pub because: Vec<String>,
    /// Joined reasons, empty when accepted
    pub but: String,
    /// `adopted` or `rejected`
    pub so: String,
    /// Itemized reasons
    pub reasons: Vec<String>,
    /// Metrics block
    pub metrics: ReceiptMetrics,
    /// Policy flags
    pub policy: Policy,
}

/// A sealed, content-addressed receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Title
    pub title: String,
    /// `OK` or `ERROR`
    pub status: String,
    /// Lane the run tuned
    pub lane: LaneId,
    /// Verdict
    pub verdict: Verdict,
    /// What the pipeline does
    pub point: String,
    /// Evidence strings
    pub because: Vec<String>,
    /// Joined reasons, empty when accepted
    pub but: String,
    /// `adopted` or `rejected`
    pub so: String,
    /// Itemized reasons
    pub reasons: Vec<String>,
    /// Metrics block
    pub metrics: ReceiptMetrics,
    /// Policy flags
    pub policy: Policy,
    /// Issuance stamp
    pub stamp: Stamp,
}

impl Receipt {
    /// Stamp a draft and compute its digest.
    pub fn seal(draft: ReceiptDraft, issued_at: Time) -> crate::Result<Self> {
        let unsealed = Self {
            title: draft.title,
            status: draft.status,
            lane: draft.lane,
            verdict: draft.verdict,
            point: draft.point,
            because: draft.because,
            but: draft.but,
            so: draft.so,
            reasons: draft.reasons,
            metrics: draft.metrics,
            policy: draft.policy,
            stamp: Stamp { issued_at, digest_sha256: String::new() },
        };
        let digest = canonical_digest(&unsealed)?;
        Ok(Self {
            stamp: Stamp { issued_at, digest_sha256: digest },
            ..unsealed
        })
    }

    /// Digest stored on the receipt.
    pub fn digest(&self) -> &str {
        &self.stamp.digest_sha256
    }

    /// Recompute the digest and compare it to the stored one.
    pub fn verify_digest(&self) -> crate::Result<bool> {
        let mut blank = self.clone();
        blank.stamp.digest_sha256.clear();
        Ok(canonical_digest(&blank)? == self.stamp.digest_sha256)
    }

    /// Verify a persisted receipt document without going through the typed
    /// model.
    pub fn verify_document(text: &str) -> crate::Result<bool> {
        let mut doc: Value = serde_json::from_str(text)?;
        let stored = doc
            .pointer("/stamp/digest_sha256")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let Some(stored) = stored else {
            return Ok(false);
        };
        if let Some(slot) = doc.pointer_mut("/stamp/digest_sha256") {
            *slot = Value::String(String::new());
        }
        Ok(digest_value(doc)? == stored)
    }

    /// Pretty JSON as persisted.
    pub fn to_document(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Hex SHA-256 of the key-sorted compact JSON rendering of `value`.
pub fn canonical_digest<T: Serialize>(value: &T) -> crate::Result<String> {
    digest_value(serde_json::to_value(value)?)
}

fn digest_value(value: Value) -> crate::Result<String> {
    let bytes = serde_json::to_vec(&canonicalize(value))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

// Object keys are re-inserted in sorted order so the rendering does not depend
// on how `serde_json::Map` orders entries.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonicalize(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
