//! Compute instances — the controller node and pool members.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node state as reported by the provider.
///
/// Only `Running` and `Stopped` are ever acted upon. Transitional and
/// terminal states (pending, stopping, terminated, ...) are carried as
/// `Other` and surface as an unsupported-state failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    Running,
    Stopped,
    Other(String),
}

impl From<String> for NodeState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => NodeState::Running,
            "stopped" => NodeState::Stopped,
            _ => NodeState::Other(value),
        }
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        state.to_string()
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Running => f.write_str("running"),
            NodeState::Stopped => f.write_str("stopped"),
            NodeState::Other(state) => f.write_str(state),
        }
    }
}

/// A compute node as last described by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub state: NodeState,
    /// Instance class, used as the pricing-table key.
    pub instance_class: String,
    pub launch_time: Option<DateTime<Utc>>,
    /// Billed at the reduced, interruptible spot rate.
    pub spot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_state_round_trips_known_words() {
        assert_eq!(NodeState::from("running".to_string()), NodeState::Running);
        assert_eq!(NodeState::from("stopped".to_string()), NodeState::Stopped);
        assert_eq!(NodeState::Running.to_string(), "running");
    }

    #[test]
    fn node_state_keeps_unknown_words() {
        let state = NodeState::from("pending".to_string());
        assert_eq!(state, NodeState::Other("pending".to_string()));
        assert_eq!(state.to_string(), "pending");
    }
}
