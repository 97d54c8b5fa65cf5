//! Verdict of a judge call.

use serde::{Deserialize, Serialize};

/// Accept or reject a proposed style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The proposal may be adopted
    Accepted,
    /// The proposal violates the law
    Rejected,
}

impl Verdict {
    /// Receipt status string.
    pub fn status(self) -> &'static str {
        match self {
            Verdict::Accepted => "OK",
            Verdict::Rejected => "ERROR",
        }
    }

    /// Receipt outcome word.
    pub fn outcome(self) -> &'static str {
        match self {
            Verdict::Accepted => "adopted",
            Verdict::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Accepted => f.write_str("accepted"),
            Verdict::Rejected => f.write_str("rejected"),
        }
    }
}

/// A verdict together with the reasons behind it.
///
/// Reasons are empty exactly when the verdict is `Accepted`. Once a reason is
/// recorded the judgement can never return to `Accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Judgement {
    reasons: Vec<String>,
}

impl Judgement {
    /// Start with an accepting judgement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation.
    pub fn reject(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Current verdict.
    pub fn verdict(&self) -> Verdict {
        if self.reasons.is_empty() {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }

    /// Reasons in rule order.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Split into verdict and reasons.
    pub fn into_parts(self) -> (Verdict, Vec<String>) {
        (self.verdict(), self.reasons)
    }
}
