//! Law model - the immutable policy a style is judged against.

use serde::{Deserialize, Serialize};

/// The policy document for a run.
///
/// Loaded once and passed by shared reference into every component; nothing
/// downstream holds a mutable handle to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Law {
    /// Document version, if the law file carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Structural constraints
    #[serde(default)]
    pub constraints: Constraints,

    /// Benchmark thresholds
    pub benchmark: Benchmark,

    /// Exception policy
    pub exception: ExceptionPolicy,
}

/// Structural constraints on what a style may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Styles can never edit thresholds. Missing means `false` (fail closed).
    #[serde(default)]
    pub no_threshold_edits_by_style: bool,
}

/// Benchmark thresholds for shadow metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Maximum tolerated false-green rate
    pub max_false_green: f64,
    /// Maximum tolerated flap index
    pub max_flap_index: f64,
    /// Target recovery half-life, in evaluation cycles
    pub target_recovery_halflife: f64,
}

/// Exception policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionPolicy {
    /// Target exception rate
    pub target_rate: f64,
}

impl Law {
    /// A law that admits nothing.
    ///
    /// The structural constraint is off and every threshold is zero. Used as
    /// a placeholder for components that only read law metadata when the law
    /// document cannot be parsed; such runs are judged with
    /// `Judge::judge_malformed`, never against these thresholds.
    pub fn fail_closed() -> Self {
        Self {
            version: None,
            constraints: Constraints { no_threshold_edits_by_style: false },
            benchmark: Benchmark {
                max_false_green: 0.0,
                max_flap_index: 0.0,
                target_recovery_halflife: 0.0,
            },
            exception: ExceptionPolicy { target_rate: 0.0 },
        }
    }

    /// Whether the structural constraint protecting thresholds holds.
    pub fn is_sealed(&self) -> bool {
        self.constraints.no_threshold_edits_by_style
    }
}
