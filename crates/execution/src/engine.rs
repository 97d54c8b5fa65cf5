//! The tuning engine - runs one governed self-tuning pass for a lane.

use anyhow::Context;
use chrono::SubsecRound;
use coach_core::{LaneId, Law, Metrics, Receipt, Style, Time, Verdict};
use coach_evolution::{Proposer, ProposerConfig, ShadowSimulator};
use coach_quality::Judge;
use coach_storage::{ReceiptPaths, Storage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::ReceiptWriter;

/// Configuration for the tuning engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Proposal settings
    pub proposer: ProposerConfig,
    /// Noise amplitude of the shadow simulator
    pub shadow_noise: f64,
    /// Whether to mirror the law next to the receipts
    pub mirror_law: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proposer: ProposerConfig::default(),
            shadow_noise: 0.03,
            mirror_law: true,
        }
    }
}

/// The tuning engine.
///
/// Runs the governed loop, strictly in sequence:
/// ```text
/// Load style → Propose → Shadow evaluate → Judge → (maybe) Commit → Receipt
/// ```
///
/// One engine serves one lane. Callers must not run two engines for the same
/// lane at once; the style store is read once and overwritten without a lock.
pub struct TuningEngine<S: Storage> {
    storage: S,
    lane: LaneId,
    proposer: Proposer,
    simulator: ShadowSimulator,
    judge: Judge,
    writer: ReceiptWriter,
    config: EngineConfig,
    rng: StdRng,
}

impl<S: Storage> TuningEngine<S> {
    /// Create an engine for `lane`, drawing randomness from OS entropy.
    pub fn new(storage: S, lane: LaneId) -> Self {
        let config = EngineConfig::default();
        Self {
            storage,
            lane,
            proposer: Proposer::new().with_config(config.proposer.clone()),
            simulator: ShadowSimulator::new().with_noise(config.shadow_noise),
            judge: Judge::new(),
            writer: ReceiptWriter::new(),
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the random source so a run can be replayed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.proposer = Proposer::new().with_config(config.proposer.clone());
        self.simulator = ShadowSimulator::new().with_noise(config.shadow_noise);
        self.config = config;
        self
    }

    /// Set the receipt writer.
    pub fn with_writer(mut self, writer: ReceiptWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Run one pass, stamping the receipt with the current time.
    pub async fn run(&mut self) -> anyhow::Result<RunOutcome> {
        let now = chrono::Utc::now().trunc_subsecs(0);
        self.run_at(now).await
    }

    /// Run one pass, stamping the receipt with `issued_at`.
    pub async fn run_at(&mut self, issued_at: Time) -> anyhow::Result<RunOutcome> {
        info!("Starting tuning run for lane {}", self.lane);

        // 1. Law
        let law_doc = self.storage.load_law().await.context("loading law")?;
        let (law, malformed) = match law_doc.parsed {
            Ok(law) => (law, None),
            Err(e) => {
                warn!("Law document is malformed ({}); this run cannot adopt", e);
                (Law::fail_closed(), Some(e.to_string()))
            }
        };
        if malformed.is_none() && !law.is_sealed() {
            warn!("Law does not forbid threshold edits by style; this run cannot adopt");
        }

        // 2. Current style
        let old = match self.storage.load_style(&self.lane).await.context("loading style")? {
            Some(style) => style,
            None => {
                info!("No style for lane {}, starting from the conservative default", self.lane);
                Style::conservative()
            }
        };

        // 3. Propose
        let new = self.proposer.propose(&old, &mut self.rng);
        info!("Proposed {:?}", new);

        // 4. Shadow evaluate
        let history = self.storage.load_history(&self.lane).await.context("loading history")?;
        let metrics = self.simulator.evaluate(&law, &new, &history, &mut self.rng);
        info!("Shadow metrics {:?}", metrics);

        // 5. Judge
        let judgement = match &malformed {
            Some(error) => self.judge.judge_malformed(error),
            None => self.judge.judge(&law, &old, &new, &metrics),
        };
        let (verdict, reasons) = judgement.into_parts();
        info!("Verdict: {}", verdict);

        // 6. Commit
        let committed = verdict == Verdict::Accepted;
        if committed {
            self.storage
                .save_style(&self.lane, &new)
                .await
                .context("committing style")?;
            info!("Adopted new style for lane {}", self.lane);
        }

        // 7. Receipt
        let (receipt, receipt_paths) = self
            .writer
            .write(&mut self.storage, verdict, &reasons, &old, &new, &metrics, &self.lane, issued_at)
            .await
            .context("writing receipt")?;

        if self.config.mirror_law {
            self.storage.mirror_law(&law_doc.raw).await.context("mirroring law")?;
        }

        Ok(RunOutcome {
            verdict,
            reasons,
            old,
            new,
            metrics,
            receipt,
            receipt_paths,
            committed,
        })
    }

    /// The lane this engine tunes.
    pub fn lane(&self) -> &LaneId {
        &self.lane
    }

    /// Get a reference to the storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Get a mutable reference to the storage.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

/// Result of a single tuning run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Verdict
    pub verdict: Verdict,
    /// Reasons, empty when accepted
    pub reasons: Vec<String>,
    /// Style before the run
    pub old: Style,
    /// Proposed style
    pub new: Style,
    /// Shadow metrics of the proposal
    pub metrics: Metrics,
    /// Sealed receipt
    pub receipt: Receipt,
    /// Where the receipt was written
    pub receipt_paths: ReceiptPaths,
    /// Whether the style store was updated
    pub committed: bool,
}
