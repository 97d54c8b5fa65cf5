//! Lane identity.

use serde::{Deserialize, Serialize};
use crate::CoreError;

/// Identifier for an independently tuned lane.
///
/// Lane ids become path segments of the style store and the receipt trail,
/// so only ASCII alphanumerics, `-` and `_` are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LaneId(String);

impl LaneId {
    /// Create a lane id, validating its characters.
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(name))
        } else {
            Err(CoreError::InvalidLane(name))
        }
    }

    /// Borrow the raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for LaneId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LaneId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LaneId> for String {
    fn from(lane: LaneId) -> Self {
        lane.0
    }
}
