//! Shadow metrics produced for a candidate style.

use serde::{Deserialize, Serialize};

/// Per-metric ceilings applied before metrics leave the simulator.
pub struct MetricCeilings;

impl MetricCeilings {
    /// Ceiling for `false_green`
    pub const FALSE_GREEN: f64 = 0.20;
    /// Ceiling for `flap_index`
    pub const FLAP_INDEX: f64 = 0.40;
    /// Ceiling for `recovery_halflife`
    pub const RECOVERY_HALFLIFE: u32 = 16;
    /// Ceiling for `exception_rate`
    pub const EXCEPTION_RATE: f64 = 0.20;
}

/// Predicted outcome of running a style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Risk of masking a real failure as healthy
    pub false_green: f64,
    /// Oscillation / instability
    pub flap_index: f64,
    /// Evaluation cycles needed to recover after an incident
    pub recovery_halflife: u32,
    /// Frequency of policy exceptions granted
    pub exception_rate: f64,
}

impl Metrics {
    /// Build metrics from raw heuristic outputs.
    ///
    /// Real values are floored at zero, capped at their ceiling and rounded to
    /// three decimals. The half-life is truncated toward zero, then kept in
    /// `[1, RECOVERY_HALFLIFE]`.
    pub fn bounded(false_green: f64, flap_index: f64, recovery_halflife: f64, exception_rate: f64) -> Self {
        let halflife = if recovery_halflife.is_finite() {
            recovery_halflife.trunc().clamp(1.0, f64::from(MetricCeilings::RECOVERY_HALFLIFE)) as u32
        } else {
            MetricCeilings::RECOVERY_HALFLIFE
        };
        Self {
            false_green: bound_real(false_green, MetricCeilings::FALSE_GREEN),
            flap_index: bound_real(flap_index, MetricCeilings::FLAP_INDEX),
            recovery_halflife: halflife,
            exception_rate: bound_real(exception_rate, MetricCeilings::EXCEPTION_RATE),
        }
    }

    /// Whether every metric sits inside `[0, ceiling]`.
    pub fn within_ceilings(&self) -> bool {
        (0.0..=MetricCeilings::FALSE_GREEN).contains(&self.false_green)
            && (0.0..=MetricCeilings::FLAP_INDEX).contains(&self.flap_index)
            && (1..=MetricCeilings::RECOVERY_HALFLIFE).contains(&self.recovery_halflife)
            && (0.0..=MetricCeilings::EXCEPTION_RATE).contains(&self.exception_rate)
    }
}

// NaN is treated as the worst case.
fn bound_real(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return ceiling;
    }
    crate::round_to(value.clamp(0.0, ceiling), 3)
}
