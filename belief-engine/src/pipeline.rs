// Belief Refresh Pipeline
// Runs agents for an (event, entity) pair and appends their proposals
// together with the next belief snapshot to the pair's chain

use super::aggregator::{aggregate, proposal_spread};
use super::change::{BeliefChange, ChangeDetector};
use super::storage::{check_chain_link, BeliefStore, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use common::{BeliefSnapshot, ForecastProposal, Signal};
use forecast_agents::{AgentInput, AgentRegistry};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the refresh pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on entities refreshed at the same time by `refresh_many`
    pub max_concurrent_entities: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_entities: 8,
        }
    }
}

/// Signals gathered for one entity
#[derive(Debug, Clone)]
pub struct EntitySignals {
    pub entity_id: String,
    pub signals: Vec<Signal>,
}

impl EntitySignals {
    pub fn new(entity_id: impl Into<String>, signals: Vec<Signal>) -> Self {
        Self {
            entity_id: entity_id.into(),
            signals,
        }
    }
}

/// Everything produced by one successful refresh
#[derive(Debug, Clone, Serialize)]
pub struct BeliefUpdate {
    pub snapshot: BeliefSnapshot,
    pub previous: Option<BeliefSnapshot>,
    pub proposals: Vec<ForecastProposal>,
    pub change: BeliefChange,
}

/// Belief refresh pipeline
pub struct BeliefPipeline {
    registry: Arc<AgentRegistry>,
    detector: ChangeDetector,
    beliefs: Arc<dyn BeliefStore>,
    config: PipelineConfig,
}

impl BeliefPipeline {
    pub fn new<S>(registry: Arc<AgentRegistry>, detector: ChangeDetector, store: Arc<S>, config: PipelineConfig) -> Self
    where
        S: BeliefStore + 'static,
    {
        info!(
            agents = registry.len(),
            threshold = detector.threshold(),
            max_concurrent_entities = config.max_concurrent_entities,
            "Creating belief pipeline"
        );
        Self {
            registry,
            detector,
            beliefs: store,
            config,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Refresh the belief for one entity.
    ///
    /// Returns `Ok(None)` when no agent produced a proposal; in that case
    /// nothing is written and the chain is left untouched. `as_of` is
    /// truncated to microseconds, the precision every store keeps.
    pub async fn refresh_entity(
        &self,
        event_id: &str,
        entity_id: &str,
        signals: &[Signal],
        as_of: DateTime<Utc>,
    ) -> Result<Option<BeliefUpdate>, StoreError> {
        let as_of = as_of.trunc_subsecs(6);
        let input = AgentInput::new(event_id, entity_id, signals, as_of);
        let proposals = self.registry.generate(&input);

        let aggregated = aggregate(&proposals);
        if aggregated.is_empty() {
            debug!(
                event_id = %event_id,
                entity_id = %entity_id,
                "No proposals, keeping current belief"
            );
            return Ok(None);
        }

        let previous = self.beliefs.latest_belief(event_id, entity_id).await?;
        let mut snapshot =
            BeliefSnapshot::new(event_id, entity_id, aggregated.probability, aggregated.confidence, as_of)
                .following(previous.as_ref());
        if let Some(spread) = proposal_spread(&proposals) {
            snapshot = snapshot.with_interval(spread);
        }

        // Reject stale rounds before any proposal is written
        check_chain_link(&snapshot, previous.as_ref().map(|p| (p.belief_id.as_str(), p.as_of))).inspect_err(|e| {
            warn!(
                event_id = %event_id,
                entity_id = %entity_id,
                error = %e,
                "Rejected belief refresh"
            )
        })?;

        // A writer racing on the same pair is caught by the store's own check
        self.beliefs.insert_belief_round(&snapshot, &proposals).await?;

        let change = self.detector.detect(&snapshot, previous.as_ref());
        info!(
            event_id = %event_id,
            entity_id = %entity_id,
            belief_id = %snapshot.belief_id,
            probability = %snapshot.probability,
            confidence = %snapshot.confidence,
            change = %change.change_type,
            proposals = proposals.len(),
            "Belief refreshed"
        );

        Ok(Some(BeliefUpdate {
            snapshot,
            previous,
            proposals,
            change,
        }))
    }

    /// Refresh many entities for one event with bounded concurrency.
    ///
    /// Results come back in input order, one per entity; a failure for one
    /// entity does not stop the others.
    pub async fn refresh_many(
        &self,
        event_id: &str,
        batch: &[EntitySignals],
        as_of: DateTime<Utc>,
    ) -> Vec<(String, Result<Option<BeliefUpdate>, StoreError>)> {
        let limit = self.config.max_concurrent_entities.max(1);
        info!(event_id = %event_id, entities = batch.len(), limit, "Refreshing beliefs");

        stream::iter(batch)
            .map(|item| async move {
                let result = self
                    .refresh_entity(event_id, &item.entity_id, &item.signals, as_of)
                    .await;
                (item.entity_id.clone(), result)
            })
            .buffered(limit)
            .collect()
            .await
    }
}
