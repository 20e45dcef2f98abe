//! Per-team health probe state (spec §3, §4.7).
//!
//! A single file per team holding a map from agent name to its last known
//! content hash and change timestamp. Rewritten atomically after each probe
//! cycle; not locked, since only one coordinator session owns a team's
//! health file at a time.

use std::collections::HashMap;

use crate::error::Result;
use crate::schema::HealthProbeState;
use crate::store::{self, Store};

/// Load the current probe state for every known teammate, keyed by name.
pub fn load(store: &Store, team_name: &str) -> Result<HashMap<String, HealthProbeState>> {
    let path = store.health_path(team_name);
    if !store::exists(&path) {
        return Ok(HashMap::new());
    }
    let states: Vec<HealthProbeState> = store::read_json(&path)?;
    Ok(states.into_iter().map(|s| (s.agent_name.clone(), s)).collect())
}

/// Persist the full probe-state map, replacing whatever was there before.
pub fn save(store: &Store, team_name: &str, states: &HashMap<String, HealthProbeState>) -> Result<()> {
    let mut list: Vec<&HealthProbeState> = states.values().collect();
    list.sort_by(|a, b| a.agent_name.cmp(&b.agent_name));
    store::write_json(&store.health_path(team_name), &list)?;
    Ok(())
}

/// Record a content-hash observation for `agent`, updating `last_change_ms`
/// only when the hash differs from what was previously stored.
pub fn record_observation(
    states: &mut HashMap<String, HealthProbeState>,
    agent: &str,
    content_hash: String,
    now_ms: u64,
) -> bool {
    let entry = states
        .entry(agent.to_string())
        .or_insert_with(|| HealthProbeState::new(agent));

    let changed = entry.content_hash.as_deref() != Some(content_hash.as_str());
    if changed {
        entry.content_hash = Some(content_hash);
        entry.last_change_ms = Some(now_ms);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let mut states = HashMap::new();
        record_observation(&mut states, "r1", "hash-a".to_string(), 100);
        save(&store, "demo", &states).unwrap();

        let reloaded = load(&store, "demo").unwrap();
        assert_eq!(reloaded["r1"].content_hash.as_deref(), Some("hash-a"));
        assert_eq!(reloaded["r1"].last_change_ms, Some(100));
    }

    #[test]
    fn unchanged_hash_does_not_bump_timestamp() {
        let mut states = HashMap::new();
        record_observation(&mut states, "r1", "hash-a".to_string(), 100);
        let changed = record_observation(&mut states, "r1", "hash-a".to_string(), 200);
        assert!(!changed);
        assert_eq!(states["r1"].last_change_ms, Some(100));
    }

    #[test]
    fn changed_hash_bumps_timestamp() {
        let mut states = HashMap::new();
        record_observation(&mut states, "r1", "hash-a".to_string(), 100);
        let changed = record_observation(&mut states, "r1", "hash-b".to_string(), 200);
        assert!(changed);
        assert_eq!(states["r1"].last_change_ms, Some(200));
    }

    #[test]
    fn missing_file_loads_empty_map() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        assert!(load(&store, "demo").unwrap().is_empty());
    }
}
