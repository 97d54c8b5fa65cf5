//! Proposer - nudges the current style by small, legal steps.

use coach_core::{Bound, ReflexAction, Style, StyleBounds};
use rand::Rng;
use tracing::debug;

/// Configuration for the proposer.
#[derive(Debug, Clone)]
pub struct ProposerConfig {
    /// Probability of swapping the last two reflexes
    pub p_swap: f64,
}

impl Default for ProposerConfig {
    fn default() -> Self {
        Self { p_swap: 0.20 }
    }
}

/// Generates candidate styles close to the current one.
#[derive(Debug, Clone, Default)]
pub struct Proposer {
    config: ProposerConfig,
}

impl Proposer {
    /// Create a proposer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ProposerConfig) -> Self {
        self.config = config;
        self
    }

    /// Propose a candidate derived from `old`.
    ///
    /// Each numeric field moves one step up or down and is clamped to its
    /// bound. The reflex order keeps its sequence unless the swap draw hits,
    /// in which case only the last two entries trade places.
    pub fn propose<R: Rng + ?Sized>(&self, old: &Style, rng: &mut R) -> Style {
        let forgiveness = nudge(StyleBounds::FORGIVENESS, old.forgiveness, rng);
        let smoothing = nudge(StyleBounds::SMOOTHING, old.smoothing, rng);
        let vkd_discount = nudge(StyleBounds::VKD_DISCOUNT, old.vkd_discount, rng);

        let reflex_order = if rng.gen::<f64>() < self.config.p_swap {
            swap_last_two(&old.reflex_order)
        } else {
            old.reflex_order.clone()
        };

        let proposal = Style { forgiveness, smoothing, reflex_order, vkd_discount };
        debug!("Proposed style {:?} from {:?}", proposal, old);
        proposal
    }
}

fn nudge<R: Rng + ?Sized>(bound: Bound, value: f64, rng: &mut R) -> f64 {
    let delta = if rng.gen::<bool>() { bound.step } else { -bound.step };
    bound.clamp(value + delta)
}

fn swap_last_two(order: &[ReflexAction]) -> Vec<ReflexAction> {
    let mut swapped = order.to_vec();
    let n = swapped.len();
    if n >= 2 {
        swapped.swap(n - 1, n - 2);
    }
    swapped
}
