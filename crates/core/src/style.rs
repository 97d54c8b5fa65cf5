//! Style model - the tunable parameters of a lane.

use serde::{Deserialize, Serialize};
use crate::CoreError;

/// A corrective action taken when an incident occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflexAction {
    /// Roll back to the last known-good state
    Rollback,
    /// Apply static rules before anything adaptive
    RulesFirst,
    /// Retune parameters in place
    Retune,
}

impl ReflexAction {
    /// The fixed action set every `reflex_order` permutes.
    pub const ALL: [ReflexAction; 3] = [
        ReflexAction::Rollback,
        ReflexAction::RulesFirst,
        ReflexAction::Retune,
    ];
}

/// Closed numeric range with the proposal step size for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
    /// Magnitude of a single proposal nudge
    pub step: f64,
}

impl Bound {
    /// Clamp into range and round to two decimals.
    pub fn clamp(&self, value: f64) -> f64 {
        crate::round_to(value.clamp(self.min, self.max), 2)
    }

    /// Whether `value` lies in range.
    pub fn contains(&self, value: f64) -> bool {
        const EPS: f64 = 1e-9;
        value.is_finite() && value >= self.min - EPS && value <= self.max + EPS
    }

    fn check(&self, field: &'static str, value: f64) -> crate::Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(CoreError::OutOfBounds { field, value, min: self.min, max: self.max })
        }
    }
}

/// Documented bounds for every numeric style field.
pub struct StyleBounds;

impl StyleBounds {
    /// How quickly to forgive after an incident
    pub const FORGIVENESS: Bound = Bound { min: 0.02, max: 0.30, step: 0.02 };
    /// EMA / windowing strength
    pub const SMOOTHING: Bound = Bound { min: 0.05, max: 0.40, step: 0.05 };
    /// Discount applied to short-term wins
    pub const VKD_DISCOUNT: Bound = Bound { min: 0.20, max: 0.90, step: 0.05 };
}

/// The tunable parameters for one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// How quickly to forgive after an incident
    pub forgiveness: f64,

    /// EMA / windowing
    pub smoothing: f64,

    /// Priority order of corrective actions
    pub reflex_order: Vec<ReflexAction>,

    /// Discount on short-term wins
    pub vkd_discount: f64,
}

impl Style {
    /// The conservative house style used when a lane has no style file yet.
    pub fn conservative() -> Self {
        Self {
            forgiveness: 0.10,
            smoothing: 0.20,
            reflex_order: ReflexAction::ALL.to_vec(),
            vkd_discount: 0.50,
        }
    }

    /// Check every field against its bound and the reflex order against the
    /// action set.
    pub fn validate(&self) -> crate::Result<()> {
        StyleBounds::FORGIVENESS.check("forgiveness", self.forgiveness)?;
        StyleBounds::SMOOTHING.check("smoothing", self.smoothing)?;
        StyleBounds::VKD_DISCOUNT.check("vkd_discount", self.vkd_discount)?;
        if !is_permutation(&self.reflex_order) {
            return Err(CoreError::NotAPermutation(self.reflex_order.clone()));
        }
        Ok(())
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::conservative()
    }
}

fn is_permutation(order: &[ReflexAction]) -> bool {
    let mut sorted = order.to_vec();
    sorted.sort();
    let mut expected = ReflexAction::ALL.to_vec();
    expected.sort();
    sorted == expected
}
