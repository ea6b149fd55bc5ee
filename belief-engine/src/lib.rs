// Belief Engine
// Turns agent proposals into immutable belief snapshots and classifies how
// each new snapshot moved relative to the one before it

pub mod aggregator;
pub mod change;
pub mod pipeline;
pub mod postgres;
pub mod storage;

pub use aggregator::{aggregate, proposal_spread, AggregatedBelief};
pub use change::{BeliefChange, ChangeDetector, ChangeDetectorConfig, DEFAULT_MATERIALITY_THRESHOLD};
pub use pipeline::{BeliefPipeline, BeliefUpdate, EntitySignals, PipelineConfig};
pub use postgres::PgStore;
pub use storage::{BeliefStore, InMemoryStore, ProposalStore, SignalStore, StoreError};
