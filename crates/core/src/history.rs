//! History model - past lane events consumed read-only by the simulator.

use serde::{Deserialize, Serialize};
use crate::Time;

/// One line of a lane's history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// When it happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<Time>,

    /// Health band the lane reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,

    /// Anything else on the line
    #[serde(flatten)]
    pub detail: serde_json::Map<String, serde_json::Value>,
}

/// Read-only access to a lane's past events.
pub trait HistorySource {
    /// Events in log order.
    fn events(&self) -> &[HistoryEvent];

    /// Number of events available.
    fn len(&self) -> usize {
        self.events().len()
    }

    /// Whether there is no history at all.
    fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

/// An in-memory history window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    events: Vec<HistoryEvent>,
}

impl History {
    /// Wrap already-loaded events.
    pub fn new(events: Vec<HistoryEvent>) -> Self {
        Self { events }
    }

    /// No history.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl HistorySource for History {
    fn events(&self) -> &[HistoryEvent] {
        &self.events
    }
}
