//! Portfolio overview: one row per entity with its latest belief and risk band

use chrono::{DateTime, Utc};
use common::{BeliefSnapshot, Confidence, Probability};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Below this probability an entity is high risk
pub const HIGH_RISK_BELOW: f64 = 0.4;
/// Below this probability (and at or above `HIGH_RISK_BELOW`) an entity is medium risk
pub const MEDIUM_RISK_BELOW: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    HighRisk,
    MediumRisk,
    LowRisk,
}

impl RiskLevel {
    pub fn from_probability(probability: Probability) -> Self {
        let p = probability.value();
        if p < HIGH_RISK_BELOW {
            RiskLevel::HighRisk
        } else if p < MEDIUM_RISK_BELOW {
            RiskLevel::MediumRisk
        } else {
            RiskLevel::LowRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::HighRisk => "high_risk",
            RiskLevel::MediumRisk => "medium_risk",
            RiskLevel::LowRisk => "low_risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub entity_id: String,
    pub probability: Probability,
    pub confidence: Confidence,
    /// Move since the previous snapshot, absent for a first belief
    pub delta: Option<f64>,
    pub risk_level: RiskLevel,
    pub as_of: DateTime<Utc>,
}

impl PortfolioItem {
    pub fn from_beliefs(current: &BeliefSnapshot, previous: Option<&BeliefSnapshot>) -> Self {
        Self {
            entity_id: current.entity_id.clone(),
            probability: current.probability,
            confidence: current.confidence,
            delta: previous.map(|p| current.probability.value() - p.probability.value()),
            risk_level: RiskLevel::from_probability(current.probability),
            as_of: current.as_of,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn level(p: f64) -> RiskLevel {
        RiskLevel::from_probability(Probability::new(p).unwrap())
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(level(0.0), RiskLevel::HighRisk);
        assert_eq!(level(0.39), RiskLevel::HighRisk);
        assert_eq!(level(0.4), RiskLevel::MediumRisk);
        assert_eq!(level(0.69), RiskLevel::MediumRisk);
        assert_eq!(level(0.7), RiskLevel::LowRisk);
        assert_eq!(level(1.0), RiskLevel::LowRisk);
    }

    #[test]
    fn test_item_delta() {
        let t0 = Utc::now();
        let prev = BeliefSnapshot::new("E", "acme", Probability::new(0.6).unwrap(), Confidence::Medium, t0);
        let cur = BeliefSnapshot::new(
            "E",
            "acme",
            Probability::new(0.35).unwrap(),
            Confidence::Medium,
            t0 + Duration::hours(1),
        )
        .following(Some(&prev));

        let item = PortfolioItem::from_beliefs(&cur, Some(&prev));
        assert!((item.delta.unwrap() + 0.25).abs() < 1e-9);
        assert_eq!(item.risk_level, RiskLevel::HighRisk);
        assert_eq!(PortfolioItem::from_beliefs(&prev, None).delta, None);
    }

    #[test]
    fn test_risk_level_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RiskLevel::MediumRisk).unwrap(), "\"medium_risk\"");
    }
}
