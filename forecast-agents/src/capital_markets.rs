//! Capital Markets Agent - rule-based funding outlook
//!
//! Starts from a fixed base rate and applies one penalty per warning sign:
//!
//! | signal          | condition        | adjustment |
//! |-----------------|------------------|------------|
//! | `runway_months` | numeric and < 6  | -0.15      |
//! | `burn_rate`     | `true`           | -0.10      |
//! | `hiring_signal` | `true`           | -0.05      |
//!
//! The result is clamped to [0, 1]. The rationale lists every adjustment in the
//! order above, followed by the final probability to two decimals.

use super::agent::{AgentInput, ForecastAgent};
use common::{ForecastProposal, Probability, NEXT_ROUND_RAISED};

pub const CAPITAL_MARKETS_AGENT_ID: &str = "capital_markets_agent_v1";

const BASE_PROBABILITY: f64 = 0.6;
const SHORT_RUNWAY_MONTHS: f64 = 6.0;
const SHORT_RUNWAY_PENALTY: f64 = 0.15;
const HIGH_BURN_PENALTY: f64 = 0.1;
const ACTIVE_HIRING_PENALTY: f64 = 0.05;

const SUPPORTED_EVENTS: &[&str] = &[NEXT_ROUND_RAISED];
const REQUIRED_SIGNALS: &[&str] = &["runway_months", "burn_rate", "hiring_signal"];

#[derive(Debug, Clone, Default)]
pub struct CapitalMarketsAgent;

impl CapitalMarketsAgent {
    pub fn new() -> Self {
        Self
    }

    /// Apply the penalty table, returning the raw score and the adjustments taken
    fn score(&self, input: &AgentInput<'_>) -> (f64, Vec<String>) {
        let mut probability = BASE_PROBABILITY;
        let mut adjustments = Vec::new();

        if let Some(runway) = input.latest("runway_months").and_then(|s| s.value().as_f64()) {
            if runway < SHORT_RUNWAY_MONTHS {
                probability -= SHORT_RUNWAY_PENALTY;
                adjustments.push(format!("runway below {} months ({})", SHORT_RUNWAY_MONTHS, runway));
            }
        }

        if input.latest("burn_rate").is_some_and(|s| s.value().is_true()) {
            probability -= HIGH_BURN_PENALTY;
            adjustments.push("high burn rate detected".to_string());
        }

        if input.latest("hiring_signal").is_some_and(|s| s.value().is_true()) {
            probability -= ACTIVE_HIRING_PENALTY;
            adjustments.push("active hiring detected".to_string());
        }

        (probability, adjustments)
    }
}

impl ForecastAgent for CapitalMarketsAgent {
    fn agent_id(&self) -> &str {
        CAPITAL_MARKETS_AGENT_ID
    }

    fn supported_events(&self) -> &[&str] {
        SUPPORTED_EVENTS
    }

    fn required_signals(&self) -> &[&str] {
        REQUIRED_SIGNALS
    }

    fn generate_proposals(&self, input: &AgentInput<'_>) -> Vec<ForecastProposal> {
        if !self.supports(input.event_id) {
            return Vec::new();
        }

        let (raw, adjustments) = self.score(input);
        let probability = Probability::clamped(raw);

        let rationale = if adjustments.is_empty() {
            format!(
                "Base probability {} with no negative adjustments. Final probability: {:.2}",
                BASE_PROBABILITY,
                probability.value()
            )
        } else {
            format!(
                "Base probability {} adjusted by: {}. Final probability: {:.2}",
                BASE_PROBABILITY,
                adjustments.join(", "),
                probability.value()
            )
        };

        vec![ForecastProposal::new(
            CAPITAL_MARKETS_AGENT_ID,
            input.event_id,
            input.entity_id,
            probability,
            rationale,
            input.as_of,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Signal, SignalValue};

    fn signals(entity: &str, values: Vec<(&str, SignalValue)>) -> Vec<Signal> {
        let now = Utc::now();
        values
            .into_iter()
            .enumerate()
            .map(|(i, (signal_type, value))| {
                Signal::new(format!("sig-{}", i), entity, signal_type, value, now, "test").unwrap()
            })
            .collect()
    }

    fn propose(signals: &[Signal]) -> ForecastProposal {
        let agent = CapitalMarketsAgent::new();
        let input = AgentInput::new(NEXT_ROUND_RAISED, "acme", signals, Utc::now());
        let mut proposals = agent.generate_proposals(&input);
        assert_eq!(proposals.len(), 1);
        proposals.remove(0)
    }

    #[test]
    fn test_short_runway_and_high_burn() {
        let signals = signals(
            "acme",
            vec![
                ("runway_months", SignalValue::Number(4.0)),
                ("burn_rate", SignalValue::Bool(true)),
                ("hiring_signal", SignalValue::Bool(false)),
            ],
        );
        let proposal = propose(&signals);

        assert!((proposal.proposed_probability.value() - 0.35).abs() < 1e-9);
        assert_eq!(
            proposal.rationale,
            "Base probability 0.6 adjusted by: runway below 6 months (4), high burn rate detected. \
             Final probability: 0.35"
        );
        assert_eq!(proposal.agent_id, CAPITAL_MARKETS_AGENT_ID);
        assert_eq!(proposal.entity_id, "acme");
        assert_eq!(proposal.event_id, NEXT_ROUND_RAISED);
    }

    #[test]
    fn test_all_penalties() {
        let signals = signals(
            "acme",
            vec![
                ("hiring_signal", SignalValue::Bool(true)),
                ("runway_months", SignalValue::Number(2.5)),
                ("burn_rate", SignalValue::Bool(true)),
            ],
        );
        let proposal = propose(&signals);

        assert!((proposal.proposed_probability.value() - 0.3).abs() < 1e-9);
        // Adjustments follow the check order, not the signal order
        assert_eq!(
            proposal.rationale,
            "Base probability 0.6 adjusted by: runway below 6 months (2.5), high burn rate detected, \
             active hiring detected. Final probability: 0.30"
        );
    }

    #[test]
    fn test_no_adjustments() {
        let signals = signals(
            "acme",
            vec![
                ("runway_months", SignalValue::Number(18.0)),
                ("burn_rate", SignalValue::Bool(false)),
            ],
        );
        let proposal = propose(&signals);

        assert_eq!(proposal.proposed_probability.value(), 0.6);
        assert_eq!(
            proposal.rationale,
            "Base probability 0.6 with no negative adjustments. Final probability: 0.60"
        );
    }

    #[test]
    fn test_missing_signals_degrade_gracefully() {
        let proposal = propose(&[]);
        assert_eq!(proposal.proposed_probability.value(), 0.6);
        assert!(proposal.rationale.contains("no negative adjustments"));
    }

    #[test]
    fn test_runway_boundary_not_penalised() {
        let signals = signals("acme", vec![("runway_months", SignalValue::Number(6.0))]);
        assert_eq!(propose(&signals).proposed_probability.value(), 0.6);
    }

    #[test]
    fn test_unsupported_event() {
        let agent = CapitalMarketsAgent::new();
        let input = AgentInput::new("ACQUIRED", "acme", &[], Utc::now());
        assert!(agent.generate_proposals(&input).is_empty());
    }

    #[test]
    fn test_deterministic_scoring() {
        let signals = signals("acme", vec![("burn_rate", SignalValue::Bool(true))]);
        let a = propose(&signals);
        let b = propose(&signals);
        assert_eq!(a.proposed_probability, b.proposed_probability);
        assert_eq!(a.rationale, b.rationale);
    }
}
