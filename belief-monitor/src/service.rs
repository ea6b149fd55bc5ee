// Belief Monitor Service
// Read-side operations exposed to the transport layer

use crate::alert_builder::{AlertBuilder, BeliefConfidence, ChangeRecord};
use crate::config::MonitorConfig;
use crate::portfolio::PortfolioItem;
use crate::suggestion_builder::SuggestionBuilder;
use belief_engine::{BeliefStore, ChangeDetector, ProposalStore, StoreError};
use chrono::{DateTime, Utc};
use common::{
    AlertCandidate, BeliefHistoryEntry, BeliefSnapshot, ChangeType, Confidence, DecisionSuggestion, ForecastProposal,
    Probability,
};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const RATIONALE_SEPARATOR: &str = " | ";
pub const NO_PROPOSALS_RATIONALE: &str = "No agent proposals available";

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no belief found for event {event_id} and entity {entity_id}")]
    NotFound { event_id: String, entity_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MonitorError {
    fn not_found(event_id: &str, entity_id: &str) -> Self {
        MonitorError::NotFound {
            event_id: event_id.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingAgent {
    pub agent_id: String,
    pub proposed_probability: Probability,
}

/// The latest belief together with the proposals that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeliefExplanation {
    pub belief: BeliefSnapshot,
    pub contributing_agents: Vec<ContributingAgent>,
    pub proposals: Vec<ForecastProposal>,
    /// Proposal rationales joined with `" | "`
    pub rationale: String,
}

/// Classified move of an entity's latest belief
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange {
    pub event_id: String,
    pub entity_id: String,
    pub belief_id: String,
    pub previous_belief_id: Option<String>,
    pub probability: Probability,
    pub confidence: Confidence,
    pub change_type: ChangeType,
    pub delta: Option<f64>,
    pub as_of: DateTime<Utc>,
}

impl EntityChange {
    fn change_record(&self) -> ChangeRecord {
        ChangeRecord {
            entity_id: self.entity_id.clone(),
            event_id: self.event_id.clone(),
            change_type: self.change_type,
            probability: self.probability,
            delta: self.delta,
            as_of: self.as_of,
        }
    }
}

struct EntityState {
    current: BeliefSnapshot,
    previous: Option<BeliefSnapshot>,
}

pub struct BeliefMonitor {
    beliefs: Arc<dyn BeliefStore>,
    proposals: Arc<dyn ProposalStore>,
    detector: ChangeDetector,
    alert_builder: AlertBuilder,
    suggestion_builder: SuggestionBuilder,
    history_limit: usize,
}

impl BeliefMonitor {
    pub fn new<S>(store: Arc<S>, detector: ChangeDetector, alert_builder: AlertBuilder, history_limit: usize) -> Self
    where
        S: BeliefStore + ProposalStore + 'static,
    {
        Self {
            beliefs: store.clone(),
            proposals: store,
            detector,
            alert_builder,
            suggestion_builder: SuggestionBuilder::new(),
            history_limit,
        }
    }

    pub fn from_config<S>(store: Arc<S>, config: &MonitorConfig) -> Self
    where
        S: BeliefStore + ProposalStore + 'static,
    {
        Self::new(
            store,
            ChangeDetector::new(config.detector_config()),
            AlertBuilder::new(config.alert_config()),
            config.history_limit,
        )
    }

    pub async fn latest_belief(&self, event_id: &str, entity_id: &str) -> Result<BeliefSnapshot, MonitorError> {
        self.beliefs
            .latest_belief(event_id, entity_id)
            .await?
            .ok_or_else(|| MonitorError::not_found(event_id, entity_id))
    }

    /// Oldest-first history; `limit` defaults to the configured history limit
    pub async fn belief_history(
        &self,
        event_id: &str,
        entity_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<BeliefHistoryEntry>, MonitorError> {
        let limit = limit.unwrap_or(self.history_limit);
        Ok(self.beliefs.belief_history(event_id, entity_id, limit).await?)
    }

    /// Explain the latest belief through the proposal round that produced it.
    ///
    /// That round is the set of proposals sharing the newest `created_at` at
    /// or before the belief's `as_of`.
    pub async fn explain_belief(&self, event_id: &str, entity_id: &str) -> Result<BeliefExplanation, MonitorError> {
        let belief = self.latest_belief(event_id, entity_id).await?;
        let all = self.proposals.get_proposals(event_id, entity_id).await?;

        let round_at = all
            .iter()
            .map(|p| p.created_at)
            .filter(|at| *at <= belief.as_of)
            .max();
        let proposals: Vec<ForecastProposal> = match round_at {
            Some(at) => all.into_iter().filter(|p| p.created_at == at).collect(),
            None => Vec::new(),
        };

        let contributing_agents = proposals
            .iter()
            .map(|p| ContributingAgent {
                agent_id: p.agent_id.clone(),
                proposed_probability: p.proposed_probability,
            })
            .collect();

        let rationale = if proposals.is_empty() {
            NO_PROPOSALS_RATIONALE.to_string()
        } else {
            proposals
                .iter()
                .map(|p| p.rationale.as_str())
                .collect::<Vec<_>>()
                .join(RATIONALE_SEPARATOR)
        };

        Ok(BeliefExplanation {
            belief,
            contributing_agents,
            proposals,
            rationale,
        })
    }

    /// Change between the latest belief and its predecessor
    pub async fn entity_change(&self, event_id: &str, entity_id: &str) -> Result<EntityChange, MonitorError> {
        let state = self
            .entity_state(event_id, entity_id)
            .await?
            .ok_or_else(|| MonitorError::not_found(event_id, entity_id))?;
        Ok(self.classify(&state))
    }

    /// Changes for every entity with a belief, material or not
    pub async fn portfolio_changes(&self, event_id: &str) -> Result<Vec<EntityChange>, MonitorError> {
        let states = self.portfolio_states(event_id).await?;
        Ok(states.iter().map(|s| self.classify(s)).collect())
    }

    /// Ranked alerts for material changes across the portfolio
    pub async fn portfolio_alerts(&self, event_id: &str) -> Result<Vec<AlertCandidate>, MonitorError> {
        let changes = self.portfolio_changes(event_id).await?;

        let records: Vec<ChangeRecord> = changes
            .iter()
            .filter(|c| c.change_type.is_material())
            .map(EntityChange::change_record)
            .collect();
        let confidences: Vec<BeliefConfidence> = changes
            .iter()
            .map(|c| BeliefConfidence {
                entity_id: c.entity_id.clone(),
                confidence: c.confidence,
            })
            .collect();

        let alerts = self.alert_builder.build(&records, &confidences);
        info!(
            event_id = %event_id,
            entities = changes.len(),
            material = records.len(),
            alerts = alerts.len(),
            "Computed portfolio alerts"
        );
        Ok(alerts)
    }

    pub async fn portfolio_suggestions(&self, event_id: &str) -> Result<Vec<DecisionSuggestion>, MonitorError> {
        let alerts = self.portfolio_alerts(event_id).await?;
        Ok(self.suggestion_builder.build(&alerts))
    }

    pub async fn portfolio_overview(&self, event_id: &str) -> Result<Vec<PortfolioItem>, MonitorError> {
        let states = self.portfolio_states(event_id).await?;
        Ok(states
            .iter()
            .map(|s| PortfolioItem::from_beliefs(&s.current, s.previous.as_ref()))
            .collect())
    }

    fn classify(&self, state: &EntityState) -> EntityChange {
        let change = self.detector.detect(&state.current, state.previous.as_ref());
        EntityChange {
            event_id: state.current.event_id.clone(),
            entity_id: state.current.entity_id.clone(),
            belief_id: state.current.belief_id.clone(),
            previous_belief_id: state.previous.as_ref().map(|p| p.belief_id.clone()),
            probability: state.current.probability,
            confidence: state.current.confidence,
            change_type: change.change_type,
            delta: change.delta,
            as_of: state.current.as_of,
        }
    }

    async fn entity_state(&self, event_id: &str, entity_id: &str) -> Result<Option<EntityState>, StoreError> {
        let Some(current) = self.beliefs.latest_belief(event_id, entity_id).await? else {
            return Ok(None);
        };
        let previous = self
            .beliefs
            .previous_belief(event_id, entity_id, Some(&current.belief_id))
            .await?;
        Ok(Some(EntityState { current, previous }))
    }

    /// Latest and previous belief for every entity, fetched concurrently
    async fn portfolio_states(&self, event_id: &str) -> Result<Vec<EntityState>, StoreError> {
        let entities = self.beliefs.entities_with_beliefs(event_id).await?;
        debug!(event_id = %event_id, entities = entities.len(), "Loading portfolio beliefs");

        let states = try_join_all(entities.iter().map(|entity| self.entity_state(event_id, entity))).await?;
        Ok(states.into_iter().flatten().collect())
    }
}
