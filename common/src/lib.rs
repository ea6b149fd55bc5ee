//! Shared data model for the belief pipeline
//!
//! Every type here is immutable once built. Entities that carry a probability,
//! a confidence level or a typed signal value validate on construction (and on
//! deserialization), so malformed input never reaches the downstream stages.

pub mod alert;
pub mod belief;
pub mod error;
pub mod event;
pub mod probability;
pub mod proposal;
pub mod signal;

pub use alert::{AlertCandidate, ChangeType, DecisionSuggestion};
pub use belief::{BeliefHistoryEntry, BeliefSnapshot};
pub use error::ModelError;
pub use event::{Event, ResolutionType, NEXT_ROUND_RAISED};
pub use probability::{Confidence, ConfidenceInterval, Probability};
pub use proposal::ForecastProposal;
pub use signal::{Signal, SignalValue, ValueShape};

// Re-export for downstream crates that build snapshots and proposals
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
