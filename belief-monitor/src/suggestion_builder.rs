// Suggestion Builder
// Expands each alert into two or three recommended next actions

use common::{AlertCandidate, ChangeType, Confidence, DecisionSuggestion};
use tracing::debug;

/// Drops below this probability are escalated
pub const DROP_ESCALATION_PROBABILITY: f64 = 0.3;
/// Rises above this probability are escalated
pub const RISE_ESCALATION_PROBABILITY: f64 = 0.7;

const MIN_SUGGESTIONS_PER_ALERT: usize = 2;

// (suggestion, reason detail) used when a change type has no template
const GENERIC_SUGGESTIONS: [(&str, &str); MIN_SUGGESTIONS_PER_ALERT] = [
    ("Monitor entity and track belief evolution", "Standard monitoring recommended"),
    ("Revisit entity at the next scheduled review", "No change-specific guidance available"),
];

#[derive(Debug, Clone, Default)]
pub struct SuggestionBuilder;

impl SuggestionBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Suggestions for every alert, flattened in alert order
    pub fn build(&self, alerts: &[AlertCandidate]) -> Vec<DecisionSuggestion> {
        let suggestions: Vec<DecisionSuggestion> = alerts.iter().flat_map(|a| self.for_alert(a)).collect();
        debug!(alerts = alerts.len(), suggestions = suggestions.len(), "Built decision suggestions");
        suggestions
    }

    /// Two base suggestions keyed by change type plus an optional escalation
    pub fn for_alert(&self, alert: &AlertCandidate) -> Vec<DecisionSuggestion> {
        let prob_pct = format!("{:.1}%", alert.probability.as_percent());
        let p = alert.probability.value();
        let mut out = Vec::with_capacity(3);
        let suggest = |suggestion: &str, detail: String| DecisionSuggestion {
            entity_id: alert.entity_id.clone(),
            event_id: alert.event_id.clone(),
            suggestion: suggestion.to_string(),
            reason: format!("Alert: {} - {}", alert.reason, detail),
            as_of: alert.as_of,
        };

        match alert.change_type {
            ChangeType::SignificantDrop => {
                out.push(suggest(
                    "Review recent signals and update risk assessment",
                    format!("Probability dropped to {}", prob_pct),
                ));
                out.push(suggest(
                    "Consider reducing exposure or increasing monitoring frequency",
                    "Significant probability decline detected".to_string(),
                ));
                if p < DROP_ESCALATION_PROBABILITY {
                    out.push(suggest(
                        "Escalate for immediate review and potential action",
                        "Probability below 30% threshold".to_string(),
                    ));
                }
            }
            ChangeType::SignificantRise => {
                out.push(suggest(
                    "Review positive signals and validate probability increase",
                    format!("Probability increased to {}", prob_pct),
                ));
                out.push(suggest(
                    "Consider increasing allocation or follow-up analysis",
                    "Significant probability improvement".to_string(),
                ));
                if p > RISE_ESCALATION_PROBABILITY {
                    out.push(suggest(
                        "High probability - prepare for potential event outcome",
                        "Probability above 70% threshold".to_string(),
                    ));
                }
            }
            ChangeType::Initial => {
                out.push(suggest(
                    "Establish baseline monitoring and set review schedule",
                    "Initial belief established".to_string(),
                ));
                out.push(suggest(
                    "Gather additional signals to improve confidence",
                    "New entity requires signal collection".to_string(),
                ));
                if alert.confidence == Confidence::Low {
                    out.push(suggest(
                        "Prioritize signal collection to increase confidence level",
                        "Low confidence requires more data".to_string(),
                    ));
                }
            }
            ChangeType::NoMaterialChange => {}
        }

        for (suggestion, detail) in GENERIC_SUGGESTIONS {
            if out.len() >= MIN_SUGGESTIONS_PER_ALERT {
                break;
            }
            out.push(suggest(suggestion, detail.to_string()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert_builder::priority_rank;
    use chrono::Utc;
    use common::Probability;

    fn alert(change_type: ChangeType, p: f64, confidence: Confidence) -> AlertCandidate {
        let probability = Probability::new(p).unwrap();
        AlertCandidate {
            entity_id: "acme".to_string(),
            event_id: "NEXT_ROUND_RAISED".to_string(),
            probability,
            delta: None,
            change_type,
            confidence,
            priority_rank: priority_rank(change_type, probability, confidence),
            reason: "test reason".to_string(),
            as_of: Utc::now(),
        }
    }

    fn texts(suggestions: &[DecisionSuggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.suggestion.as_str()).collect()
    }

    #[test]
    fn test_drop_below_threshold_escalates() {
        let a = alert(ChangeType::SignificantDrop, 0.2, Confidence::Low);
        let suggestions = SuggestionBuilder::new().for_alert(&a);

        assert_eq!(a.priority_rank, 4);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(
            suggestions[2].suggestion,
            "Escalate for immediate review and potential action"
        );
        assert_eq!(
            suggestions[0].reason,
            "Alert: test reason - Probability dropped to 20.0%"
        );
    }

    #[test]
    fn test_drop_at_threshold_not_escalated() {
        let suggestions = SuggestionBuilder::new().for_alert(&alert(ChangeType::SignificantDrop, 0.3, Confidence::High));
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn test_rise_escalation() {
        let builder = SuggestionBuilder::new();
        let high = builder.for_alert(&alert(ChangeType::SignificantRise, 0.8, Confidence::High));
        let moderate = builder.for_alert(&alert(ChangeType::SignificantRise, 0.7, Confidence::High));

        assert_eq!(high.len(), 3);
        assert_eq!(high[2].suggestion, "High probability - prepare for potential event outcome");
        assert_eq!(moderate.len(), 2);
    }

    #[test]
    fn test_initial_low_confidence_escalation() {
        let builder = SuggestionBuilder::new();
        let low = builder.for_alert(&alert(ChangeType::Initial, 0.6, Confidence::Low));
        let medium = builder.for_alert(&alert(ChangeType::Initial, 0.6, Confidence::Medium));

        assert_eq!(
            texts(&low),
            vec![
                "Establish baseline monitoring and set review schedule",
                "Gather additional signals to improve confidence",
                "Prioritize signal collection to increase confidence level",
            ]
        );
        assert_eq!(medium.len(), 2);
    }

    #[test]
    fn test_untemplated_change_padded_to_two() {
        let suggestions = SuggestionBuilder::new().for_alert(&alert(ChangeType::NoMaterialChange, 0.5, Confidence::High));
        assert_eq!(
            texts(&suggestions),
            vec![
                "Monitor entity and track belief evolution",
                "Revisit entity at the next scheduled review",
            ]
        );
    }

    #[test]
    fn test_build_flattens_in_alert_order() {
        let alerts = vec![
            alert(ChangeType::SignificantDrop, 0.2, Confidence::Low),
            alert(ChangeType::Initial, 0.6, Confidence::High),
        ];
        let suggestions = SuggestionBuilder::new().build(&alerts);

        assert_eq!(suggestions.len(), 5);
        assert_eq!(suggestions[0].suggestion, "Review recent signals and update risk assessment");
        assert_eq!(suggestions[3].suggestion, "Establish baseline monitoring and set review schedule");
    }
}
