// Belief Storage Interface
// Append-only persistence for signals, proposals and belief snapshots

use chrono::{DateTime, Utc};
use common::{BeliefHistoryEntry, BeliefSnapshot, ForecastProposal, ModelError, Signal};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot {belief_id} at {as_of} is not newer than the latest belief for {event_id}/{entity_id}")]
    NonMonotonicAsOf {
        belief_id: String,
        event_id: String,
        entity_id: String,
        as_of: DateTime<Utc>,
    },

    #[error("snapshot {belief_id} links to {found:?} but the latest belief is {expected:?}")]
    BrokenChain {
        belief_id: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("record {0} already exists")]
    Duplicate(String),

    #[error("stored record {id} is malformed: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: ModelError,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Check that `snapshot` may be appended after the current chain tail
///
/// `as_of` must be strictly newer than the tail and `previous_belief_id` must
/// name the tail exactly (or be empty when there is no tail).
pub(crate) fn check_chain_link(
    snapshot: &BeliefSnapshot,
    tail: Option<(&str, DateTime<Utc>)>,
) -> Result<(), StoreError> {
    if let Some((_, tail_as_of)) = tail {
        if snapshot.as_of <= tail_as_of {
            return Err(StoreError::NonMonotonicAsOf {
                belief_id: snapshot.belief_id.clone(),
                event_id: snapshot.event_id.clone(),
                entity_id: snapshot.entity_id.clone(),
                as_of: snapshot.as_of,
            });
        }
    }

    let expected = tail.map(|(id, _)| id);
    if snapshot.previous_belief_id.as_deref() != expected {
        return Err(StoreError::BrokenChain {
            belief_id: snapshot.belief_id.clone(),
            expected: expected.map(str::to_string),
            found: snapshot.previous_belief_id.clone(),
        });
    }
    Ok(())
}

/// Trait for belief snapshot storage backends
#[async_trait::async_trait]
pub trait BeliefStore: Send + Sync {
    /// Distinct entities with at least one belief for the event, sorted
    async fn entities_with_beliefs(&self, event_id: &str) -> Result<Vec<String>, StoreError>;

    /// Snapshot with the greatest `as_of`
    async fn latest_belief(&self, event_id: &str, entity_id: &str) -> Result<Option<BeliefSnapshot>, StoreError>;

    /// Snapshot immediately older than the reference one.
    ///
    /// The reference is `current_belief_id` when given, otherwise the latest
    /// snapshot. An unknown reference id yields `None`.
    async fn previous_belief(
        &self,
        event_id: &str,
        entity_id: &str,
        current_belief_id: Option<&str>,
    ) -> Result<Option<BeliefSnapshot>, StoreError>;

    /// Oldest-first history, capped at `limit` entries
    async fn belief_history(
        &self,
        event_id: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<BeliefHistoryEntry>, StoreError>;

    /// Append a snapshot; never updates or deletes
    async fn insert_belief_snapshot(&self, snapshot: &BeliefSnapshot) -> Result<(), StoreError>;

    /// Append a refresh round: the proposals and the snapshot built from them.
    ///
    /// Either everything is written or nothing is, so a round rejected by the
    /// chain check leaves no proposals behind.
    async fn insert_belief_round(
        &self,
        snapshot: &BeliefSnapshot,
        proposals: &[ForecastProposal],
    ) -> Result<(), StoreError>;
}

/// Trait for forecast proposal storage backends
#[async_trait::async_trait]
pub trait ProposalStore: Send + Sync {
    async fn insert_proposal(&self, proposal: &ForecastProposal) -> Result<(), StoreError>;

    /// All proposals for the pair, newest first
    async fn get_proposals(&self, event_id: &str, entity_id: &str) -> Result<Vec<ForecastProposal>, StoreError>;
}

/// Trait for signal storage backends
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    async fn insert_signal(&self, signal: &Signal) -> Result<(), StoreError>;

    /// Signals for an entity in insertion order
    async fn get_signals(&self, entity_id: &str) -> Result<Vec<Signal>, StoreError>;
}

type PairKey = (String, String);

fn pair_key(event_id: &str, entity_id: &str) -> PairKey {
    (event_id.to_string(), entity_id.to_string())
}

/// In-memory storage (for testing, development and the demo binary)
///
/// Snapshots live in an arena keyed by `belief_id`; each (event, entity)
/// keeps an ordered list of ids that forms its chain. Appends take the
/// chain's shard lock, so concurrent writers for one pair are serialized.
#[derive(Default)]
pub struct InMemoryStore {
    snapshots: DashMap<String, BeliefSnapshot>,
    chains: DashMap<PairKey, Vec<String>>,
    proposals: DashMap<PairKey, Vec<ForecastProposal>>,
    signals: DashMap<String, Vec<Signal>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain for a pair, oldest first
    fn chain(&self, event_id: &str, entity_id: &str) -> Vec<BeliefSnapshot> {
        // Copy the ids out before touching the arena
        let ids = match self.chains.get(&pair_key(event_id, entity_id)) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.snapshots.get(id).map(|s| s.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl BeliefStore for InMemoryStore {
    async fn entities_with_beliefs(&self, event_id: &str) -> Result<Vec<String>, StoreError> {
        let entities: BTreeSet<String> = self
            .chains
            .iter()
            .filter(|entry| entry.key().0 == event_id && !entry.value().is_empty())
            .map(|entry| entry.key().1.clone())
            .collect();
        Ok(entities.into_iter().collect())
    }

    async fn latest_belief(&self, event_id: &str, entity_id: &str) -> Result<Option<BeliefSnapshot>, StoreError> {
        let tail_id = self
            .chains
            .get(&pair_key(event_id, entity_id))
            .and_then(|ids| ids.last().cloned());
        Ok(tail_id.and_then(|id| self.snapshots.get(&id).map(|s| s.clone())))
    }

    async fn previous_belief(
        &self,
        event_id: &str,
        entity_id: &str,
        current_belief_id: Option<&str>,
    ) -> Result<Option<BeliefSnapshot>, StoreError> {
        let chain = self.chain(event_id, entity_id);

        let reference = match current_belief_id {
            Some(id) => chain.iter().find(|s| s.belief_id == id),
            None => chain.last(),
        };
        let Some(reference) = reference else {
            return Ok(None);
        };

        Ok(chain
            .iter()
            .rev()
            .find(|s| s.as_of < reference.as_of)
            .cloned())
    }

    async fn belief_history(
        &self,
        event_id: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<BeliefHistoryEntry>, StoreError> {
        Ok(self
            .chain(event_id, entity_id)
            .iter()
            .take(limit)
            .map(BeliefSnapshot::history_entry)
            .collect())
    }

    async fn insert_belief_snapshot(&self, snapshot: &BeliefSnapshot) -> Result<(), StoreError> {
        self.insert_belief_round(snapshot, &[]).await
    }

    async fn insert_belief_round(
        &self,
        snapshot: &BeliefSnapshot,
        proposals: &[ForecastProposal],
    ) -> Result<(), StoreError> {
        let key = pair_key(&snapshot.event_id, &snapshot.entity_id);
        let mut chain = self.chains.entry(key.clone()).or_default();

        let tail = chain
            .last()
            .and_then(|id| self.snapshots.get(id).map(|s| (s.belief_id.clone(), s.as_of)));
        check_chain_link(snapshot, tail.as_ref().map(|(id, at)| (id.as_str(), *at)))?;

        // Lock order: chain, then proposals, then arena
        let mut stored = self.proposals.entry(key).or_default();
        if let Some(dup) = proposals
            .iter()
            .find(|p| stored.iter().any(|s| s.proposal_id == p.proposal_id))
        {
            return Err(StoreError::Duplicate(dup.proposal_id.clone()));
        }

        match self.snapshots.entry(snapshot.belief_id.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(snapshot.belief_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(snapshot.clone());
            }
        }
        stored.extend(proposals.iter().cloned());
        chain.push(snapshot.belief_id.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProposalStore for InMemoryStore {
    async fn insert_proposal(&self, proposal: &ForecastProposal) -> Result<(), StoreError> {
        let mut proposals = self
            .proposals
            .entry(pair_key(&proposal.event_id, &proposal.entity_id))
            .or_default();
        if proposals.iter().any(|p| p.proposal_id == proposal.proposal_id) {
            return Err(StoreError::Duplicate(proposal.proposal_id.clone()));
        }
        proposals.push(proposal.clone());
        Ok(())
    }

    async fn get_proposals(&self, event_id: &str, entity_id: &str) -> Result<Vec<ForecastProposal>, StoreError> {
        let mut proposals = self
            .proposals
            .get(&pair_key(event_id, entity_id))
            .map(|p| p.clone())
            .unwrap_or_default();
        // Stable: same-instant proposals keep insertion order
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }
}

#[async_trait::async_trait]
impl SignalStore for InMemoryStore {
    async fn insert_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        let mut signals = self.signals.entry(signal.entity_id().to_string()).or_default();
        if signals.iter().any(|s| s.signal_id() == signal.signal_id()) {
            return Err(StoreError::Duplicate(signal.signal_id().to_string()));
        }
        signals.push(signal.clone());
        Ok(())
    }

    async fn get_signals(&self, entity_id: &str) -> Result<Vec<Signal>, StoreError> {
        Ok(self
            .signals
            .get(entity_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }
}
