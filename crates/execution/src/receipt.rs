//! Receipt writer - assembles, seals and persists the run's audit record.

use coach_core::{
    Band, Coherence, LaneId, Metrics, Policy, Receipt, ReceiptDraft, ReceiptMetrics, Style, Time, Verdict,
};
use coach_storage::{ReceiptPaths, Storage};
use tracing::info;

/// Title carried by every tuning receipt.
pub const RECEIPT_TITLE: &str = "Tuning Receipt";

/// Fixed description of the pipeline.
pub const RECEIPT_POINT: &str = "Shadow → judge by law → (maybe) adopt style";

/// Builds receipts and hands them to storage.
#[derive(Debug, Clone, Default)]
pub struct ReceiptWriter {
    policy: Policy,
}

impl ReceiptWriter {
    /// Create a writer with the default policy flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy flags stamped on receipts.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble and seal a receipt without persisting it.
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        &self,
        verdict: Verdict,
        reasons: &[String],
        old: &Style,
        new: &Style,
        metrics: &Metrics,
        lane: &LaneId,
        issued_at: Time,
    ) -> anyhow::Result<Receipt> {
        let because = vec![
            format!("lane: {}", lane),
            format!("old_style: {}", serde_json::to_string(old)?),
            format!("new_style: {}", serde_json::to_string(new)?),
            format!("sim: {}", serde_json::to_string(metrics)?),
        ];

        let band = match verdict {
            Verdict::Accepted => Band::Green,
            Verdict::Rejected => Band::Red,
        };

        let draft = ReceiptDraft {
            title: RECEIPT_TITLE.to_string(),
            status: verdict.status().to_string(),
            lane: lane.clone(),
            verdict,
            point: RECEIPT_POINT.to_string(),
            because,
            but: reasons.join("; "),
            so: verdict.outcome().to_string(),
            reasons: reasons.to_vec(),
            metrics: ReceiptMetrics {
                coherence: Coherence { band },
                shadow: metrics.clone(),
            },
            policy: self.policy.clone(),
        };

        Ok(Receipt::seal(draft, issued_at)?)
    }

    /// Assemble, seal and persist a receipt.
    ///
    /// Persistence failures propagate; there is no retry.
    #[allow(clippy::too_many_arguments)]
    pub async fn write<S: Storage>(
        &self,
        storage: &mut S,
        verdict: Verdict,
        reasons: &[String],
        old: &Style,
        new: &Style,
        metrics: &Metrics,
        lane: &LaneId,
        issued_at: Time,
    ) -> anyhow::Result<(Receipt, ReceiptPaths)> {
        let receipt = self.assemble(verdict, reasons, old, new, metrics, lane, issued_at)?;
        let paths = storage.write_receipt(lane, &receipt).await?;
        info!(
            "Wrote receipt {} to {} and {}",
            receipt.digest(),
            paths.lane.display(),
            paths.latest.display()
        );
        Ok((receipt, paths))
    }
}
