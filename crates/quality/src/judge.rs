//! The judge - compares a proposal's shadow metrics with the law.

use coach_core::{Judgement, Law, Metrics, Style};
use tracing::{debug, info};

/// Reason recorded when the law does not protect its own thresholds.
pub const LAW_INTEGRITY_REASON: &str = "law misconfigured: thresholds must be immutable";

/// Prefix of the reason recorded when the law document cannot be parsed.
pub const MALFORMED_LAW_PREFIX: &str = "law document malformed";

/// One rule of the law, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The law must forbid styles from editing thresholds
    LawIntegrity,
    /// `false_green` within `benchmark.max_false_green`
    FalseGreen,
    /// `flap_index` within `benchmark.max_flap_index`
    FlapIndex,
    /// `recovery_halflife` within `benchmark.target_recovery_halflife`
    RecoveryHalflife,
    /// `exception_rate` within `exception.target_rate`
    ExceptionRate,
    /// The candidate must itself be a legal style
    CandidateBounds,
}

impl Rule {
    /// Every rule, in the order reasons are reported.
    pub const ALL: [Rule; 6] = [
        Rule::LawIntegrity,
        Rule::FalseGreen,
        Rule::FlapIndex,
        Rule::RecoveryHalflife,
        Rule::ExceptionRate,
        Rule::CandidateBounds,
    ];

    /// Check the rule, returning a reason if it is violated.
    ///
    /// Comparisons are written so that NaN on either side counts as a
    /// violation.
    pub fn check(self, law: &Law, new: &Style, metrics: &Metrics) -> Option<String> {
        match self {
            Rule::LawIntegrity => (!law.is_sealed()).then(|| LAW_INTEGRITY_REASON.to_string()),
            Rule::FalseGreen => exceeds("false_green", metrics.false_green, law.benchmark.max_false_green),
            Rule::FlapIndex => exceeds("flap_index", metrics.flap_index, law.benchmark.max_flap_index),
            Rule::RecoveryHalflife => {
                let observed = metrics.recovery_halflife;
                let target = law.benchmark.target_recovery_halflife;
                if f64::from(observed) <= target {
                    None
                } else {
                    Some(format!("recovery_halflife {} > {}", observed, cycles(target)))
                }
            }
            Rule::ExceptionRate => exceeds("exception_rate", metrics.exception_rate, law.exception.target_rate),
            Rule::CandidateBounds => new
                .validate()
                .err()
                .map(|e| format!("candidate style rejected: {}", e)),
        }
    }
}

fn exceeds(name: &str, observed: f64, max: f64) -> Option<String> {
    if observed <= max {
        None
    } else {
        Some(format!("{} {:.3} > {:.3}", name, observed, max))
    }
}

// Whole cycle counts print as integers, fractional targets to three decimals.
fn cycles(target: f64) -> String {
    if target.is_finite() && target.fract() == 0.0 {
        format!("{}", target as i64)
    } else {
        format!("{:.3}", target)
    }
}

/// Single-shot judge. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Judge;

impl Judge {
    /// Create a judge.
    pub fn new() -> Self {
        Self
    }

    /// Judge a proposal.
    ///
    /// Every rule runs; violations accumulate in rule order, so one call can
    /// report several problems at once. `old` takes no part in any rule and
    /// is only logged, so the audit log shows the full transition.
    pub fn judge(&self, law: &Law, old: &Style, new: &Style, metrics: &Metrics) -> Judgement {
        debug!("Judging {:?} -> {:?} on {:?}", old, new, metrics);

        let mut judgement = Judgement::new();
        for rule in Rule::ALL {
            if let Some(reason) = rule.check(law, new, metrics) {
                info!("Rule {:?} violated: {}", rule, reason);
                judgement.reject(reason);
            }
        }
        judgement
    }

    /// Judge a run whose law document could not be parsed.
    ///
    /// There are no thresholds to compare against, so the only reason is the
    /// parse failure itself.
    pub fn judge_malformed(&self, error: &str) -> Judgement {
        let reason = format!("{}: {}", MALFORMED_LAW_PREFIX, error);
        info!("{}", reason);

        let mut judgement = Judgement::new();
        judgement.reject(reason);
        judgement
    }
}
