//! Forecast agent contract
//!
//! Agents are stateless apart from static configuration: given the same input
//! they produce the same probabilities and rationales.

use chrono::{DateTime, Utc};
use common::{ForecastProposal, Signal};
use serde::{Deserialize, Serialize};

/// Input for one (event, entity) invocation
#[derive(Debug, Clone)]
pub struct AgentInput<'a> {
    pub event_id: &'a str,
    pub entity_id: &'a str,
    pub signals: &'a [Signal],
    /// Stamped on every proposal produced for this input
    pub as_of: DateTime<Utc>,
}

impl<'a> AgentInput<'a> {
    pub fn new(event_id: &'a str, entity_id: &'a str, signals: &'a [Signal], as_of: DateTime<Utc>) -> Self {
        Self {
            event_id,
            entity_id,
            signals,
            as_of,
        }
    }

    /// Most recent signal of `signal_type` for this entity.
    /// On equal timestamps the later signal in input order wins.
    pub fn latest(&self, signal_type: &str) -> Option<&'a Signal> {
        self.signals
            .iter()
            .filter(|s| s.entity_id() == self.entity_id && s.signal_type() == signal_type)
            .max_by_key(|s| s.timestamp())
    }

    /// Required signal types with no matching signal in this input
    pub fn missing<'r>(&self, required: &[&'r str]) -> Vec<&'r str> {
        required
            .iter()
            .copied()
            .filter(|signal_type| self.latest(signal_type).is_none())
            .collect()
    }
}

/// Static description of a registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    pub supported_events: Vec<String>,
    pub required_signals: Vec<String>,
}

/// Trait every scoring agent implements
///
/// Missing signals are never an error: an agent skips the adjustment that
/// needed them and still reports what it could.
pub trait ForecastAgent: Send + Sync {
    fn agent_id(&self) -> &str;

    /// Event types this agent can score
    fn supported_events(&self) -> &[&str];

    /// Signal types the agent looks at
    fn required_signals(&self) -> &[&str];

    /// Score one entity. May return zero or more proposals.
    fn generate_proposals(&self, input: &AgentInput<'_>) -> Vec<ForecastProposal>;

    fn supports(&self, event_id: &str) -> bool {
        self.supported_events().iter().any(|e| *e == event_id)
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            agent_id: self.agent_id().to_string(),
            supported_events: self.supported_events().iter().map(|s| s.to_string()).collect(),
            required_signals: self.required_signals().iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::SignalValue;

    fn signal(id: &str, entity: &str, signal_type: &str, value: SignalValue, at: DateTime<Utc>) -> Signal {
        Signal::new(id, entity, signal_type, value, at, "test").unwrap()
    }

    #[test]
    fn test_latest_prefers_newest_signal() {
        let t0 = Utc::now();
        let signals = vec![
            signal("a", "acme", "runway_months", SignalValue::Number(12.0), t0 + Duration::days(1)),
            signal("b", "acme", "runway_months", SignalValue::Number(3.0), t0),
        ];
        let input = AgentInput::new("E", "acme", &signals, t0);
        assert_eq!(input.latest("runway_months").unwrap().signal_id(), "a");
    }

    #[test]
    fn test_latest_tie_takes_later_in_input() {
        let t0 = Utc::now();
        let signals = vec![
            signal("a", "acme", "burn_rate", SignalValue::Bool(false), t0),
            signal("b", "acme", "burn_rate", SignalValue::Bool(true), t0),
        ];
        let input = AgentInput::new("E", "acme", &signals, t0);
        assert_eq!(input.latest("burn_rate").unwrap().signal_id(), "b");
    }

    #[test]
    fn test_other_entities_ignored() {
        let t0 = Utc::now();
        let signals = vec![signal("a", "globex", "burn_rate", SignalValue::Bool(true), t0)];
        let input = AgentInput::new("E", "acme", &signals, t0);
        assert!(input.latest("burn_rate").is_none());
        assert_eq!(input.missing(&["burn_rate", "hiring_signal"]), vec!["burn_rate", "hiring_signal"]);
    }
}
