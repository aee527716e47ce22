//! In-Memory State Store
//!
//! Implements the host state ports over DashMaps. Used by the binary to
//! run against an exported snapshot of host state, and by tests.

use crate::domain::entities::StateRecord;
use crate::domain::ports::{HistoryReader, StateError, StateReader, StateWriter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Exported host state: current entity states plus per-entity history.
#[derive(Debug, Default, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub states: Vec<StateRecord>,
    #[serde(default)]
    pub history: HashMap<String, Vec<StateRecord>>,
}

/// DashMap-backed state store.
pub struct InMemoryStateStore {
    states: DashMap<String, StateRecord>,
    history: DashMap<String, Vec<StateRecord>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            history: DashMap::new(),
        }
    }

    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        let store = Self::new();
        for record in snapshot.states {
            store.set_state(record);
        }
        for (entity_id, mut records) in snapshot.history {
            records.sort_by_key(|r| r.last_changed);
            store.history.insert(entity_id, records);
        }
        store
    }

    /// Load a JSON snapshot file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let raw = std::fs::read_to_string(path)?;
        let snapshot: StateSnapshot = serde_json::from_str(&raw)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Set the current state of an entity.
    pub fn set_state(&self, record: StateRecord) {
        self.states.insert(record.entity_id.clone(), record);
    }

    /// Append a record to an entity's history.
    pub fn push_history(&self, record: StateRecord) {
        let mut entry = self.history.entry(record.entity_id.clone()).or_default();
        entry.push(record);
        entry.sort_by_key(|r| r.last_changed);
    }

    /// Number of entities with a current state.
    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateReader for InMemoryStateStore {
    async fn current_state(&self, entity_id: &str) -> Option<StateRecord> {
        self.states.get(entity_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl HistoryReader for InMemoryStateStore {
    async fn history(
        &self,
        entity_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<StateRecord>, StateError> {
        Ok(self
            .history
            .get(entity_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.last_changed >= since && r.last_changed <= until)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl StateWriter for InMemoryStateStore {
    async fn set_manual_countries(
        &self,
        entity_id: &str,
        codes: Vec<String>,
    ) -> Result<(), StateError> {
        let mut record = self
            .states
            .get_mut(entity_id)
            .ok_or_else(|| StateError::EntityNotFound(entity_id.to_string()))?;

        record.attributes.visited_countries = codes;
        record.last_changed = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;

    #[tokio::test]
    async fn test_current_state_roundtrip() {
        let store = InMemoryStateStore::new();
        store.set_state(StateRecord::new("person.alice", "home").with_coordinate(1.0, 2.0));

        let state = store.current_state("person.alice").await.unwrap();
        assert_eq!(state.state, "home");
        assert!(store.current_state("person.bob").await.is_none());
        assert_eq!(store.entity_count(), 1);
    }

    #[tokio::test]
    async fn test_history_filters_window_and_sorts() {
        let store = InMemoryStateStore::new();
        let now = Utc::now();

        store.push_history(
            StateRecord::new("person.alice", "b").with_last_changed(now - Duration::days(2)),
        );
        store.push_history(
            StateRecord::new("person.alice", "a").with_last_changed(now - Duration::days(5)),
        );
        store.push_history(
            StateRecord::new("person.alice", "old").with_last_changed(now - Duration::days(40)),
        );

        let records = store
            .history("person.alice", now - Duration::days(30), now)
            .await
            .unwrap();
        let states: Vec<&str> = records.iter().map(|r| r.state.as_str()).collect();
        assert_eq!(states, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_history_unknown_entity_is_empty() {
        let store = InMemoryStateStore::new();
        let now = Utc::now();
        let records = store
            .history("person.nobody", now - Duration::days(1), now)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_set_manual_countries_keeps_other_attributes() {
        let store = InMemoryStateStore::new();
        store.set_state(StateRecord::new("person.alice", "home").with_coordinate(1.0, 2.0));

        store
            .set_manual_countries("person.alice", vec!["FR".to_string()])
            .await
            .unwrap();

        let state = store.current_state("person.alice").await.unwrap();
        assert_eq!(state.attributes.visited_countries, vec!["FR"]);
        assert_eq!(state.attributes.latitude, Some(1.0));
        assert_eq!(state.state, "home");
    }

    #[tokio::test]
    async fn test_set_manual_countries_unknown_entity() {
        let store = InMemoryStateStore::new();
        let err = store
            .set_manual_countries("person.ghost", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::EntityNotFound(id) if id == "person.ghost"));
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "states": [
                    {{"entity_id": "person.alice", "state": "zone.office",
                      "attributes": {{"latitude": 48.85, "longitude": 2.35, "visited_countries": ["us"]}}}},
                    {{"entity_id": "zone.office", "state": "0",
                      "attributes": {{"latitude": 48.87, "longitude": 2.33}}}}
                ],
                "history": {{
                    "person.alice": [
                        {{"entity_id": "person.alice", "state": "not_home",
                          "attributes": {{"latitude": 40.71, "longitude": -74.0}},
                          "last_changed": "2024-01-02T00:00:00Z"}}
                    ]
                }}
            }}"#
        )
        .unwrap();

        let store = InMemoryStateStore::from_json_file(file.path()).unwrap();
        assert_eq!(store.entity_count(), 2);

        let alice = store.current_state("person.alice").await.unwrap();
        assert_eq!(alice.attributes.visited_countries, vec!["us"]);
        assert_eq!(alice.zone_entity(), Some("zone.office"));

        let since = "2024-01-01T00:00:00Z".parse().unwrap();
        let until = "2024-01-03T00:00:00Z".parse().unwrap();
        let history = store.history("person.alice", since, until).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_from_json_file_missing() {
        let result = InMemoryStateStore::from_json_file("/nonexistent/states.json");
        assert!(matches!(result, Err(StateError::Io(_))));
    }

    #[test]
    fn test_from_json_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = InMemoryStateStore::from_json_file(file.path());
        assert!(matches!(result, Err(StateError::Json(_))));
    }
}
