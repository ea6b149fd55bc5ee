//! Belief Monitor
//!
//! Turns the belief chains kept by `belief-engine` into what a portfolio
//! reviewer reads: ranked alerts, suggested next actions, a risk overview and
//! explanations of individual beliefs.

pub mod alert_builder;
pub mod config;
pub mod portfolio;
pub mod service;
pub mod suggestion_builder;

pub use alert_builder::{priority_rank, AlertBuilder, AlertConfig, BeliefConfidence, ChangeRecord, DEFAULT_MAX_ALERTS};
pub use config::{create_config_template, load_config, MonitorConfig};
pub use portfolio::{PortfolioItem, RiskLevel};
pub use service::{BeliefExplanation, BeliefMonitor, ContributingAgent, EntityChange, MonitorError};
pub use suggestion_builder::SuggestionBuilder;

// Re-export from common
pub use common::{AlertCandidate, DecisionSuggestion};
