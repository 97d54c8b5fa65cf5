//! Shadow simulator - predicts how a candidate style would behave.
//!
//! The heuristics encode directional trade-offs rather than a fitted model:
//!
//! - More forgiveness masks real failures (`false_green`) and grants more
//!   exceptions, but shortens recovery.
//! - More smoothing damps flapping and false greens, but slows recovery.
//! - A VKD discount near 1.0 chases short-term wins and flaps more.
//!
//! Every metric passes through [`Metrics::bounded`] before it is returned.

use coach_core::{HistorySource, Law, Metrics, Style};
use rand::Rng;
use tracing::debug;

/// Synthetic stand-in for a live run of the lane.
#[derive(Debug, Clone)]
pub struct ShadowSimulator {
    noise: f64,
}

impl Default for ShadowSimulator {
    fn default() -> Self {
        Self { noise: 0.03 }
    }
}

impl ShadowSimulator {
    /// Create a simulator with the default noise amplitude.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the noise amplitude added to real-valued metrics.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }

    /// Score `style` without touching the live lane.
    ///
    /// History is read but does not move the metrics.
    pub fn evaluate<H, R>(&self, law: &Law, style: &Style, history: &H, rng: &mut R) -> Metrics
    where
        H: HistorySource + ?Sized,
        R: Rng + ?Sized,
    {
        let f = style.forgiveness;
        let s = style.smoothing;
        let vkd = style.vkd_discount;

        let false_green = 0.02 + (f - 0.12) * 0.25 + (1.0 - s) * 0.05 + self.noise * rng.gen::<f64>();
        let flap_index = 0.06 + (0.30 - s) * 0.20 - (1.0 - vkd) * 0.05 + self.noise * rng.gen::<f64>();
        let recovery_halflife = 2.0 + s * 4.0 - f * 3.0 + (0.5 - vkd) * 1.5 + rng.gen::<f64>();
        let exception_rate = 0.01 + (f - 0.10) * 0.10 + self.noise * rng.gen::<f64>();

        let metrics = Metrics::bounded(false_green, flap_index, recovery_halflife, exception_rate);
        debug!(
            law_version = law.version.as_deref().unwrap_or("unversioned"),
            history_events = history.len(),
            "Shadow metrics {:?}",
            metrics
        );
        metrics
    }
}
