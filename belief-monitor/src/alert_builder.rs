// Alert Builder
// Ranks belief changes into alert candidates with a readable reason

use chrono::{DateTime, Utc};
use common::{AlertCandidate, ChangeType, Confidence, Probability};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Default cap on alerts returned per request
pub const DEFAULT_MAX_ALERTS: usize = 10;

/// One classified change for an entity's latest belief
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity_id: String,
    pub event_id: String,
    pub change_type: ChangeType,
    pub probability: Probability,
    pub delta: Option<f64>,
    pub as_of: DateTime<Utc>,
}

/// Confidence of an entity's latest belief, joined onto its change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefConfidence {
    pub entity_id: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub max_alerts: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            max_alerts: DEFAULT_MAX_ALERTS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertBuilder {
    config: AlertConfig,
}

impl AlertBuilder {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// Build ranked alerts, most urgent first.
    ///
    /// Every change in `changes` becomes a candidate; callers drop
    /// `no_material_change` records beforehand. An entity without a
    /// confidence record is treated as low confidence. Equal ranks keep
    /// their input order.
    pub fn build(&self, changes: &[ChangeRecord], beliefs: &[BeliefConfidence]) -> Vec<AlertCandidate> {
        let confidence_by_entity: HashMap<&str, Confidence> = beliefs
            .iter()
            .map(|b| (b.entity_id.as_str(), b.confidence))
            .collect();

        let mut alerts: Vec<AlertCandidate> = changes
            .iter()
            .map(|change| {
                let confidence = confidence_by_entity
                    .get(change.entity_id.as_str())
                    .copied()
                    .unwrap_or(Confidence::Low);

                AlertCandidate {
                    entity_id: change.entity_id.clone(),
                    event_id: change.event_id.clone(),
                    probability: change.probability,
                    delta: change.delta,
                    change_type: change.change_type,
                    confidence,
                    priority_rank: priority_rank(change.change_type, change.probability, confidence),
                    reason: alert_reason(change.change_type, change.probability, change.delta, confidence),
                    as_of: change.as_of,
                }
            })
            .collect();

        // sort_by_key is stable
        alerts.sort_by_key(|a| a.priority_rank);
        alerts.truncate(self.config.max_alerts);

        debug!(changes = changes.len(), alerts = alerts.len(), "Built alert candidates");
        alerts
    }
}

/// Priority rank of a change; lower is more urgent.
///
/// `base + floor((1 - p) * 2) + confidence_penalty` where the base is 1 for
/// drops, 4 for rises, 7 for initial beliefs and 10 otherwise, and the
/// confidence penalty is 0 for high, 1 for medium and 2 for low.
pub fn priority_rank(change_type: ChangeType, probability: Probability, confidence: Confidence) -> u32 {
    let base = match change_type {
        ChangeType::SignificantDrop => 1,
        ChangeType::SignificantRise => 4,
        ChangeType::Initial => 7,
        ChangeType::NoMaterialChange => 10,
    };

    let probability_adjustment = ((1.0 - probability.value()) * 2.0).floor().clamp(0.0, 2.0) as u32;

    let confidence_adjustment = match confidence {
        Confidence::High => 0,
        Confidence::Medium => 1,
        Confidence::Low => 2,
    };

    base + probability_adjustment + confidence_adjustment
}

fn alert_reason(change_type: ChangeType, probability: Probability, delta: Option<f64>, confidence: Confidence) -> String {
    let prob_pct = format!("{:.1}%", probability.as_percent());
    let delta_pct = delta
        .map(|d| format!("{:.1}%", d.abs() * 100.0))
        .unwrap_or_else(|| "N/A".to_string());

    match change_type {
        ChangeType::SignificantDrop => format!(
            "Significant drop of {} in probability to {} ({} confidence)",
            delta_pct, prob_pct, confidence
        ),
        ChangeType::SignificantRise => format!(
            "Significant rise of {} in probability to {} ({} confidence)",
            delta_pct, prob_pct, confidence
        ),
        ChangeType::Initial => format!("Initial belief established at {} ({} confidence)", prob_pct, confidence),
        ChangeType::NoMaterialChange => format!(
            "Change detected: {} to {} ({} confidence)",
            change_type, prob_pct, confidence
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn change(entity: &str, change_type: ChangeType, p: f64, delta: Option<f64>) -> ChangeRecord {
        ChangeRecord {
            entity_id: entity.to_string(),
            event_id: "NEXT_ROUND_RAISED".to_string(),
            change_type,
            probability: Probability::new(p).unwrap(),
            delta,
            as_of: Utc::now(),
        }
    }

    fn confidence(entity: &str, confidence: Confidence) -> BeliefConfidence {
        BeliefConfidence {
            entity_id: entity.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_drop_low_confidence_rank() {
        let p = Probability::new(0.2).unwrap();
        assert_eq!(priority_rank(ChangeType::SignificantDrop, p, Confidence::Low), 4);
    }

    #[test]
    fn test_rank_components() {
        let one = Probability::ONE;
        let zero = Probability::ZERO;
        assert_eq!(priority_rank(ChangeType::SignificantDrop, one, Confidence::High), 1);
        assert_eq!(priority_rank(ChangeType::SignificantRise, one, Confidence::Medium), 5);
        assert_eq!(priority_rank(ChangeType::Initial, zero, Confidence::High), 9);
        assert_eq!(priority_rank(ChangeType::NoMaterialChange, zero, Confidence::Low), 14);
    }

    #[test]
    fn test_missing_confidence_defaults_to_low() {
        let builder = AlertBuilder::default();
        let alerts = builder.build(&[change("acme", ChangeType::SignificantRise, 0.9, Some(0.2))], &[]);

        assert_eq!(alerts[0].confidence, Confidence::Low);
        assert_eq!(alerts[0].priority_rank, 6);
    }

    #[test]
    fn test_reasons() {
        let builder = AlertBuilder::default();
        let changes = vec![
            change("a", ChangeType::SignificantDrop, 0.35, Some(-0.25)),
            change("b", ChangeType::SignificantRise, 0.8, Some(0.15)),
            change("c", ChangeType::Initial, 0.6, None),
            change("d", ChangeType::NoMaterialChange, 0.5, Some(0.02)),
        ];
        let beliefs = vec![
            confidence("a", Confidence::Medium),
            confidence("b", Confidence::High),
            confidence("c", Confidence::Medium),
            confidence("d", Confidence::High),
        ];

        let alerts = builder.build(&changes, &beliefs);
        let reason = |entity: &str| alerts.iter().find(|a| a.entity_id == entity).unwrap().reason.clone();

        assert_eq!(
            reason("a"),
            "Significant drop of 25.0% in probability to 35.0% (medium confidence)"
        );
        assert_eq!(
            reason("b"),
            "Significant rise of 15.0% in probability to 80.0% (high confidence)"
        );
        assert_eq!(reason("c"), "Initial belief established at 60.0% (medium confidence)");
        assert_eq!(reason("d"), "Change detected: no_material_change to 50.0% (high confidence)");
    }

    #[test]
    fn test_drop_without_delta_reads_na() {
        let builder = AlertBuilder::default();
        let alerts = builder.build(&[change("a", ChangeType::SignificantDrop, 0.4, None)], &[]);
        assert!(alerts[0].reason.starts_with("Significant drop of N/A"));
    }

    #[test]
    fn test_sorted_truncated_and_stable() {
        let builder = AlertBuilder::new(AlertConfig { max_alerts: 3 });
        let changes = vec![
            change("initial", ChangeType::Initial, 0.6, None),
            change("rise", ChangeType::SignificantRise, 0.8, Some(0.15)),
            change("drop_1", ChangeType::SignificantDrop, 0.6, Some(-0.2)),
            change("drop_2", ChangeType::SignificantDrop, 0.6, Some(-0.3)),
        ];
        let beliefs: Vec<_> = ["initial", "rise", "drop_1", "drop_2"]
            .iter()
            .map(|e| confidence(e, Confidence::High))
            .collect();

        let alerts = builder.build(&changes, &beliefs);
        let order: Vec<&str> = alerts.iter().map(|a| a.entity_id.as_str()).collect();

        assert_eq!(order, vec!["drop_1", "drop_2", "rise"]);
        assert!(alerts.windows(2).all(|w| w[0].priority_rank <= w[1].priority_rank));
    }

    #[test]
    fn test_default_cap_is_ten() {
        let builder = AlertBuilder::default();
        let now = Utc::now();
        let changes: Vec<ChangeRecord> = (0..15)
            .map(|i| ChangeRecord {
                as_of: now + Duration::seconds(i),
                ..change(&format!("e{i}"), ChangeType::Initial, 0.5, None)
            })
            .collect();

        assert_eq!(builder.build(&changes, &[]).len(), DEFAULT_MAX_ALERTS);
    }
}
