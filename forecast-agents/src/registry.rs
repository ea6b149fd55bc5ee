//! Agent Registry - maps event types to the agents that score them
//!
//! Built once at startup and shared read-only afterwards. Adding an agent for
//! an event never requires touching the aggregator: every proposal an agent
//! emits is simply one more input to the mean.

use super::agent::{AgentDescriptor, AgentInput, ForecastAgent};
use super::capital_markets::CapitalMarketsAgent;
use common::ForecastProposal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("agent {0} is already registered")]
    DuplicateAgent(String),

    #[error("agent {0} does not declare any supported event")]
    NoSupportedEvents(String),
}

/// Registry of forecast agents keyed by event type
#[derive(Default)]
pub struct AgentRegistry {
    // Registration order is kept so proposal order is deterministic
    agents: Vec<Arc<dyn ForecastAgent>>,
    by_event: HashMap<String, Vec<Arc<dyn ForecastAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in rule-based agents
    pub fn with_default_agents() -> Self {
        let mut registry = Self::new();
        // A fresh registry cannot already contain the built-in id
        if let Err(e) = registry.register(Arc::new(CapitalMarketsAgent::new())) {
            warn!("Failed to register built-in agent: {}", e);
        }
        registry
    }

    /// Register an agent under every event it supports
    pub fn register(&mut self, agent: Arc<dyn ForecastAgent>) -> Result<(), RegistryError> {
        let agent_id = agent.agent_id().to_string();

        if self.agents.iter().any(|a| a.agent_id() == agent_id) {
            return Err(RegistryError::DuplicateAgent(agent_id));
        }
        if agent.supported_events().is_empty() {
            return Err(RegistryError::NoSupportedEvents(agent_id));
        }

        for event_id in agent.supported_events() {
            self.by_event
                .entry(event_id.to_string())
                .or_default()
                .push(Arc::clone(&agent));
        }

        info!(
            agent_id = %agent_id,
            events = ?agent.supported_events(),
            "Registered forecast agent"
        );
        self.agents.push(agent);
        Ok(())
    }

    /// Agents registered for an event, in registration order
    pub fn agents_for(&self, event_id: &str) -> &[Arc<dyn ForecastAgent>] {
        self.by_event.get(event_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Event types with at least one agent, sorted
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.by_event.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents.iter().map(|a| a.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Run every agent registered for the input's event and collect proposals
    ///
    /// Proposals addressed to a different (event, entity) than the input are
    /// discarded; they would otherwise leak into another entity's belief.
    pub fn generate(&self, input: &AgentInput<'_>) -> Vec<ForecastProposal> {
        let agents = self.agents_for(input.event_id);
        if agents.is_empty() {
            debug!(event_id = %input.event_id, "No agents registered for event");
            return Vec::new();
        }

        let mut proposals = Vec::new();
        for agent in agents {
            let missing = input.missing(agent.required_signals());
            if !missing.is_empty() {
                debug!(
                    agent_id = %agent.agent_id(),
                    entity_id = %input.entity_id,
                    missing = ?missing,
                    "Scoring with missing signals"
                );
            }

            for proposal in agent.generate_proposals(input) {
                if proposal.event_id != input.event_id || proposal.entity_id != input.entity_id {
                    warn!(
                        agent_id = %agent.agent_id(),
                        proposal_id = %proposal.proposal_id,
                        "Dropping proposal addressed to another event or entity"
                    );
                    continue;
                }
                proposals.push(proposal);
            }
        }

        debug!(
            event_id = %input.event_id,
            entity_id = %input.entity_id,
            count = proposals.len(),
            "Generated proposals"
        );
        proposals
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.iter().map(|a| a.agent_id()).collect::<Vec<_>>())
            .field("events", &self.events())
            .finish()
    }
}
