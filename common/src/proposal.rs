use crate::probability::Probability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One agent's probability opinion for an (event, entity) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastProposal {
    pub proposal_id: String,
    pub agent_id: String,
    pub event_id: String,
    pub entity_id: String,
    pub proposed_probability: Probability,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

impl ForecastProposal {
    pub fn new(
        agent_id: impl Into<String>,
        event_id: impl Into<String>,
        entity_id: impl Into<String>,
        proposed_probability: Probability,
        rationale: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            proposal_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            event_id: event_id.into(),
            entity_id: entity_id.into(),
            proposed_probability,
            rationale: rationale.into(),
            created_at,
        }
    }
}
