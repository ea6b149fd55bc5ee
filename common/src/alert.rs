use crate::error::ModelError;
use crate::probability::{Confidence, Probability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of the transition between two consecutive snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Initial,
    SignificantDrop,
    SignificantRise,
    NoMaterialChange,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Initial => "initial",
            ChangeType::SignificantDrop => "significant_drop",
            ChangeType::SignificantRise => "significant_rise",
            ChangeType::NoMaterialChange => "no_material_change",
        }
    }

    /// Whether the change is worth surfacing as an alert
    pub fn is_material(&self) -> bool {
        !matches!(self, ChangeType::NoMaterialChange)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(ChangeType::Initial),
            "significant_drop" => Ok(ChangeType::SignificantDrop),
            "significant_rise" => Ok(ChangeType::SignificantRise),
            "no_material_change" => Ok(ChangeType::NoMaterialChange),
            other => Err(ModelError::UnknownChangeType(other.to_string())),
        }
    }
}

/// Ranked, explained notification that a belief changed. Computed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub entity_id: String,
    pub event_id: String,
    pub probability: Probability,
    pub delta: Option<f64>,
    pub change_type: ChangeType,
    pub confidence: Confidence,
    /// Lower is more urgent
    pub priority_rank: u32,
    pub reason: String,
    pub as_of: DateTime<Utc>,
}

/// Recommended next action derived from an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSuggestion {
    pub entity_id: String,
    pub event_id: String,
    pub suggestion: String,
    pub reason: String,
    pub as_of: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_round_trip_names() {
        for ct in [
            ChangeType::Initial,
            ChangeType::SignificantDrop,
            ChangeType::SignificantRise,
            ChangeType::NoMaterialChange,
        ] {
            assert_eq!(ct.as_str().parse::<ChangeType>().unwrap(), ct);
            assert_eq!(serde_json::to_string(&ct).unwrap(), format!("\"{}\"", ct.as_str()));
        }
        assert!("big_drop".parse::<ChangeType>().is_err());
    }

    #[test]
    fn test_materiality() {
        assert!(ChangeType::Initial.is_material());
        assert!(ChangeType::SignificantDrop.is_material());
        assert!(!ChangeType::NoMaterialChange.is_material());
    }
}
