//! Forecast Agents
//!
//! Pluggable scorers that turn an entity's signals into forecast proposals.
//! It includes:
//! - The `ForecastAgent` trait every scorer implements
//! - `AgentRegistry`, mapping event types to the agents that score them
//! - `CapitalMarketsAgent`, the rule-based reference scorer for funding events

pub mod agent;
pub mod capital_markets;
pub mod registry;

pub use agent::{AgentDescriptor, AgentInput, ForecastAgent};
pub use capital_markets::{CapitalMarketsAgent, CAPITAL_MARKETS_AGENT_ID};
pub use registry::{AgentRegistry, RegistryError};
