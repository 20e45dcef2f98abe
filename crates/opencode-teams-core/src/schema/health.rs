//! Health probe state persisted per team (spec §3, §4.5, §4.7).

use serde::{Deserialize, Serialize};

/// Liveness classification returned by a health probe.
///
/// `Hung` only applies to the terminal backend, which has a content surface
/// to compare against; the desktop backend only ever reports `Alive` or
/// `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Alive,
    Hung,
    Dead,
    Unknown,
}

/// One teammate's last known probe result, as stored in
/// `teams/<team>/health.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbeState {
    pub agent_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_ms: Option<u64>,
}

impl HealthProbeState {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            content_hash: None,
            last_change_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_no_hash_or_timestamp() {
        let state = HealthProbeState::new("r1");
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("contentHash").is_none());
        assert!(json.get("lastChangeMs").is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Hung).unwrap(), "\"hung\"");
    }
}
