//! State Store Ports
//!
//! Define the interfaces to the host's entity state: the current state of
//! an entity, its recorded history, and writes of manually tagged countries.

use crate::domain::entities::StateRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by host state adapters.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid country code: {0:?}")]
    InvalidCountryCode(String),

    #[error("state backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Reader for the current state of host entities.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Current state of an entity, or None if the host does not know it.
    async fn current_state(&self, entity_id: &str) -> Option<StateRecord>;
}

/// Reader for recorded entity history.
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// All recorded states of an entity changed within `[since, until]`,
    /// oldest first.
    async fn history(
        &self,
        entity_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<StateRecord>, StateError>;
}

/// Writer for the manually tagged country list of an entity.
#[async_trait]
pub trait StateWriter: Send + Sync {
    /// Replace the `visited_countries` attribute, keeping everything else.
    async fn set_manual_countries(
        &self,
        entity_id: &str,
        codes: Vec<String>,
    ) -> Result<(), StateError>;
}
