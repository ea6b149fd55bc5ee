use crate::probability::{Confidence, ConfidenceInterval, Probability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable belief estimate for an (event, entity) pair
///
/// Snapshots for the same pair form a chain ordered by `as_of`; each one
/// points back at its predecessor through `previous_belief_id`. The back
/// reference is an id, not ownership: resolving it is a store lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefSnapshot {
    pub belief_id: String,
    pub event_id: String,
    pub entity_id: String,
    pub probability: Probability,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<ConfidenceInterval>,
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub previous_belief_id: Option<String>,
}

impl BeliefSnapshot {
    /// Start a new snapshot with a fresh id and no predecessor
    pub fn new(
        event_id: impl Into<String>,
        entity_id: impl Into<String>,
        probability: Probability,
        confidence: Confidence,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            belief_id: Uuid::new_v4().to_string(),
            event_id: event_id.into(),
            entity_id: entity_id.into(),
            probability,
            confidence,
            confidence_interval: None,
            as_of,
            previous_belief_id: None,
        }
    }

    /// Link this snapshot to the one it supersedes
    pub fn following(mut self, previous: Option<&BeliefSnapshot>) -> Self {
        self.previous_belief_id = previous.map(|p| p.belief_id.clone());
        self
    }

    pub fn with_interval(mut self, interval: ConfidenceInterval) -> Self {
        self.confidence_interval = Some(interval);
        self
    }

    pub fn history_entry(&self) -> BeliefHistoryEntry {
        BeliefHistoryEntry {
            belief_id: self.belief_id.clone(),
            probability: self.probability,
            confidence: self.confidence,
            as_of: self.as_of,
        }
    }
}

/// Projection of a snapshot returned by history queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefHistoryEntry {
    pub belief_id: String,
    pub probability: Probability,
    pub confidence: Confidence,
    pub as_of: DateTime<Utc>,
}
