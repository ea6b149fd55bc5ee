// Postgres Storage
// sqlx-backed implementation of the belief, proposal and signal stores

use super::storage::{check_chain_link, BeliefStore, ProposalStore, SignalStore, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use common::{
    BeliefHistoryEntry, BeliefSnapshot, Confidence, ConfidenceInterval, ForecastProposal, Probability, Signal,
    SignalValue,
};
use sqlx::postgres::{PgExecutor, PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS belief_snapshots (
    belief_id TEXT PRIMARY KEY,
    event_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    probability DOUBLE PRECISION NOT NULL CHECK (probability >= 0 AND probability <= 1),
    confidence TEXT NOT NULL,
    interval_low DOUBLE PRECISION,
    interval_high DOUBLE PRECISION,
    as_of TIMESTAMPTZ NOT NULL,
    previous_belief_id TEXT REFERENCES belief_snapshots(belief_id),
    UNIQUE (event_id, entity_id, as_of)
);

CREATE INDEX IF NOT EXISTS idx_beliefs_pair_time ON belief_snapshots(event_id, entity_id, as_of);

CREATE TABLE IF NOT EXISTS forecast_proposals (
    proposal_id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    event_id TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    proposed_probability DOUBLE PRECISION NOT NULL,
    rationale TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_proposals_pair_time ON forecast_proposals(event_id, entity_id, created_at);

CREATE TABLE IF NOT EXISTS signals (
    signal_id TEXT PRIMARY KEY,
    entity_id TEXT NOT NULL,
    signal_type TEXT NOT NULL,
    value JSONB NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL,
    source TEXT NOT NULL,
    confidence_hint DOUBLE PRECISION,
    inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_signals_entity ON signals(entity_id);
"#;

const BELIEF_COLUMNS: &str = "belief_id, event_id, entity_id, probability, confidence, \
     interval_low, interval_high, as_of, previous_belief_id";

#[derive(sqlx::FromRow)]
struct BeliefRow {
    belief_id: String,
    event_id: String,
    entity_id: String,
    probability: f64,
    confidence: String,
    interval_low: Option<f64>,
    interval_high: Option<f64>,
    as_of: DateTime<Utc>,
    previous_belief_id: Option<String>,
}

impl TryFrom<BeliefRow> for BeliefSnapshot {
    type Error = StoreError;

    fn try_from(row: BeliefRow) -> Result<Self, Self::Error> {
        let corrupt = |source| StoreError::Corrupt {
            id: row.belief_id.clone(),
            source,
        };
        let probability = Probability::new(row.probability).map_err(corrupt)?;
        let confidence = row.confidence.parse::<Confidence>().map_err(corrupt)?;
        let confidence_interval = match (row.interval_low, row.interval_high) {
            (Some(low), Some(high)) => Some(ConfidenceInterval::new(low, high).map_err(corrupt)?),
            _ => None,
        };

        Ok(BeliefSnapshot {
            belief_id: row.belief_id,
            event_id: row.event_id,
            entity_id: row.entity_id,
            probability,
            confidence,
            confidence_interval,
            as_of: row.as_of,
            previous_belief_id: row.previous_belief_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProposalRow {
    proposal_id: String,
    agent_id: String,
    event_id: String,
    entity_id: String,
    proposed_probability: f64,
    rationale: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProposalRow> for ForecastProposal {
    type Error = StoreError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let proposed_probability =
            Probability::new(row.proposed_probability).map_err(|source| StoreError::Corrupt {
                id: row.proposal_id.clone(),
                source,
            })?;
        Ok(ForecastProposal {
            proposal_id: row.proposal_id,
            agent_id: row.agent_id,
            event_id: row.event_id,
            entity_id: row.entity_id,
            proposed_probability,
            rationale: row.rationale,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SignalRow {
    signal_id: String,
    entity_id: String,
    signal_type: String,
    value: Json<SignalValue>,
    timestamp: DateTime<Utc>,
    source: String,
    confidence_hint: Option<f64>,
}

impl TryFrom<SignalRow> for Signal {
    type Error = StoreError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let id = row.signal_id.clone();
        let corrupt = |source| StoreError::Corrupt { id: id.clone(), source };
        let signal = Signal::new(
            row.signal_id,
            row.entity_id,
            row.signal_type,
            row.value.0,
            row.timestamp,
            row.source,
        )
        .map_err(corrupt)?;
        match row.confidence_hint {
            Some(hint) => signal.with_confidence_hint(hint).map_err(corrupt),
            None => Ok(signal),
        }
    }
}

/// Postgres store
pub struct PgStore {
    db_pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(db_pool: Arc<PgPool>) -> Self {
        Self { db_pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(self.db_pool.as_ref()).await?;
        info!("Belief store tables initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl BeliefStore for PgStore {
    async fn entities_with_beliefs(&self, event_id: &str) -> Result<Vec<String>, StoreError> {
        let entities = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT entity_id
            FROM belief_snapshots
            WHERE event_id = $1
            ORDER BY entity_id
            "#,
        )
        .bind(event_id)
        .fetch_all(self.db_pool.as_ref())
        .await?;
        Ok(entities)
    }

    async fn latest_belief(&self, event_id: &str, entity_id: &str) -> Result<Option<BeliefSnapshot>, StoreError> {
        let sql = format!(
            "SELECT {BELIEF_COLUMNS} FROM belief_snapshots \
             WHERE event_id = $1 AND entity_id = $2 \
             ORDER BY as_of DESC LIMIT 1"
        );
        sqlx::query_as::<_, BeliefRow>(&sql)
            .bind(event_id)
            .bind(entity_id)
            .fetch_optional(self.db_pool.as_ref())
            .await?
            .map(BeliefSnapshot::try_from)
            .transpose()
    }

    async fn previous_belief(
        &self,
        event_id: &str,
        entity_id: &str,
        current_belief_id: Option<&str>,
    ) -> Result<Option<BeliefSnapshot>, StoreError> {
        // Reference instant: the named snapshot, or the latest one
        let sql = format!(
            "SELECT {BELIEF_COLUMNS} FROM belief_snapshots \
             WHERE event_id = $1 AND entity_id = $2 \
               AND as_of < ( \
                   SELECT as_of FROM belief_snapshots \
                   WHERE event_id = $1 AND entity_id = $2 \
                     AND ($3::TEXT IS NULL OR belief_id = $3) \
                   ORDER BY as_of DESC LIMIT 1 \
               ) \
             ORDER BY as_of DESC LIMIT 1"
        );
        sqlx::query_as::<_, BeliefRow>(&sql)
            .bind(event_id)
            .bind(entity_id)
            .bind(current_belief_id)
            .fetch_optional(self.db_pool.as_ref())
            .await?
            .map(BeliefSnapshot::try_from)
            .transpose()
    }

    async fn belief_history(
        &self,
        event_id: &str,
        entity_id: &str,
        limit: usize,
    ) -> Result<Vec<BeliefHistoryEntry>, StoreError> {
        let sql = format!(
            "SELECT {BELIEF_COLUMNS} FROM belief_snapshots \
             WHERE event_id = $1 AND entity_id = $2 \
             ORDER BY as_of ASC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, BeliefRow>(&sql)
            .bind(event_id)
            .bind(entity_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.db_pool.as_ref())
            .await?;

        rows.into_iter()
            .map(|row| BeliefSnapshot::try_from(row).map(|s| s.history_entry()))
            .collect()
    }

    async fn insert_belief_snapshot(&self, snapshot: &BeliefSnapshot) -> Result<(), StoreError> {
        self.insert_belief_round(snapshot, &[]).await
    }

    async fn insert_belief_round(
        &self,
        snapshot: &BeliefSnapshot,
        proposals: &[ForecastProposal],
    ) -> Result<(), StoreError> {
        let snapshot = &at_stored_precision(snapshot);

        let mut tx = self.db_pool.begin().await?;

        // One writer per (event, entity) until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || '/' || $2))")
            .bind(&snapshot.event_id)
            .bind(&snapshot.entity_id)
            .execute(&mut *tx)
            .await?;

        let tail = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            SELECT belief_id, as_of
            FROM belief_snapshots
            WHERE event_id = $1 AND entity_id = $2
            ORDER BY as_of DESC
            LIMIT 1
            "#,
        )
        .bind(&snapshot.event_id)
        .bind(&snapshot.entity_id)
        .fetch_optional(&mut *tx)
        .await?;
        check_chain_link(snapshot, tail.as_ref().map(|(id, at)| (id.as_str(), *at)))?;

        for proposal in proposals {
            insert_proposal_row(&mut *tx, proposal).await?;
        }

        let interval = snapshot.confidence_interval.map(<(f64, f64)>::from);
        sqlx::query(
            r#"
            INSERT INTO belief_snapshots (
                belief_id, event_id, entity_id, probability, confidence,
                interval_low, interval_high, as_of, previous_belief_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&snapshot.belief_id)
        .bind(&snapshot.event_id)
        .bind(&snapshot.entity_id)
        .bind(snapshot.probability.value())
        .bind(snapshot.confidence.as_str())
        .bind(interval.map(|(low, _)| low))
        .bind(interval.map(|(_, high)| high))
        .bind(snapshot.as_of)
        .bind(&snapshot.previous_belief_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(
            belief_id = %snapshot.belief_id,
            entity_id = %snapshot.entity_id,
            proposals = proposals.len(),
            "Stored belief snapshot"
        );
        Ok(())
    }
}

/// TIMESTAMPTZ keeps microseconds, so chain checks compare what is stored
fn at_stored_precision(snapshot: &BeliefSnapshot) -> BeliefSnapshot {
    BeliefSnapshot {
        as_of: snapshot.as_of.trunc_subsecs(6),
        ..snapshot.clone()
    }
}

async fn insert_proposal_row<'e, E>(executor: E, proposal: &ForecastProposal) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO forecast_proposals (
            proposal_id, agent_id, event_id, entity_id,
            proposed_probability, rationale, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&proposal.proposal_id)
    .bind(&proposal.agent_id)
    .bind(&proposal.event_id)
    .bind(&proposal.entity_id)
    .bind(proposal.proposed_probability.value())
    .bind(&proposal.rationale)
    .bind(proposal.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl ProposalStore for PgStore {
    async fn insert_proposal(&self, proposal: &ForecastProposal) -> Result<(), StoreError> {
        insert_proposal_row(self.db_pool.as_ref(), proposal).await
    }

    async fn get_proposals(&self, event_id: &str, entity_id: &str) -> Result<Vec<ForecastProposal>, StoreError> {
        let rows = sqlx::query_as::<_, ProposalRow>(
            r#"
            SELECT proposal_id, agent_id, event_id, entity_id,
                   proposed_probability, rationale, created_at
            FROM forecast_proposals
            WHERE event_id = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_id)
        .bind(entity_id)
        .fetch_all(self.db_pool.as_ref())
        .await?;

        rows.into_iter().map(ForecastProposal::try_from).collect()
    }
}

#[async_trait::async_trait]
impl SignalStore for PgStore {
    async fn insert_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO signals (
                signal_id, entity_id, signal_type, value,
                timestamp, source, confidence_hint
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(signal.signal_id())
        .bind(signal.entity_id())
        .bind(signal.signal_type())
        .bind(Json(signal.value()))
        .bind(signal.timestamp())
        .bind(signal.source())
        .bind(signal.confidence_hint())
        .execute(self.db_pool.as_ref())
        .await?;
        Ok(())
    }

    async fn get_signals(&self, entity_id: &str) -> Result<Vec<Signal>, StoreError> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT signal_id, entity_id, signal_type, value,
                   timestamp, source, confidence_hint
            FROM signals
            WHERE entity_id = $1
            ORDER BY inserted_at ASC
            "#,
        )
        .bind(entity_id)
        .fetch_all(self.db_pool.as_ref())
        .await?;

        rows.into_iter().map(Signal::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_same_microsecond_is_not_newer() {
        let tail_at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let tail = BeliefSnapshot::new("E", "acme", Probability::new(0.6).unwrap(), Confidence::High, tail_at);

        let next = BeliefSnapshot::new(
            "E",
            "acme",
            Probability::new(0.4).unwrap(),
            Confidence::High,
            Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
        )
        .following(Some(&tail));

        // Nanoseconds alone would make it look newer
        assert!(check_chain_link(&next, Some((tail.belief_id.as_str(), tail.as_of))).is_ok());

        let stored = at_stored_precision(&next);
        assert_eq!(stored.as_of, tail_at);
        assert_eq!(stored.belief_id, next.belief_id);
        assert!(matches!(
            check_chain_link(&stored, Some((tail.belief_id.as_str(), tail.as_of))),
            Err(StoreError::NonMonotonicAsOf { .. })
        ));
    }

    #[test]
    fn test_next_microsecond_is_newer() {
        let tail_at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let tail = BeliefSnapshot::new("E", "acme", Probability::new(0.6).unwrap(), Confidence::High, tail_at);
        let next = BeliefSnapshot::new(
            "E",
            "acme",
            Probability::new(0.4).unwrap(),
            Confidence::High,
            Utc.timestamp_opt(1_700_000_000, 123_457_001).unwrap(),
        )
        .following(Some(&tail));

        let stored = at_stored_precision(&next);
        assert_eq!(stored.as_of.timestamp_subsec_nanos(), 123_457_000);
        assert!(check_chain_link(&stored, Some((tail.belief_id.as_str(), tail.as_of))).is_ok());
    }
}
