use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event tracked for every portfolio entity by default
pub const NEXT_ROUND_RAISED: &str = "NEXT_ROUND_RAISED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    Binary,
    Numeric,
}

/// A future outcome whose likelihood is tracked per entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub name: String,
    pub description: String,
    pub resolution_type: ResolutionType,
    #[serde(default)]
    pub resolve_by: Option<DateTime<Utc>>,
}

impl Event {
    pub fn next_round_raised() -> Self {
        Self {
            event_id: NEXT_ROUND_RAISED.to_string(),
            name: "Next round raised".to_string(),
            description: "The entity closes its next funding round".to_string(),
            resolution_type: ResolutionType::Binary,
            resolve_by: None,
        }
    }

    /// Definition of a built-in event, if `event_id` names one
    pub fn well_known(event_id: &str) -> Option<Self> {
        match event_id {
            NEXT_ROUND_RAISED => Some(Self::next_round_raised()),
            _ => None,
        }
    }
}
