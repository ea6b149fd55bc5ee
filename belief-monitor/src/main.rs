mod demo;

use anyhow::{Context, Result};
use belief_engine::{
    BeliefPipeline, BeliefStore, ChangeDetector, EntitySignals, InMemoryStore, PgStore, ProposalStore, SignalStore,
};
use belief_monitor::{create_config_template, load_config, BeliefMonitor, MonitorConfig};
use chrono::{DateTime, Duration, Utc};
use common::Event;
use forecast_agents::AgentRegistry;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt;

const DEFAULT_CONFIG_PATH: &str = "belief-monitor.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();

    match first.as_deref() {
        Some("init-config") => {
            let path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
            create_config_template(&path)?;
            println!("Wrote configuration template to {}", path);
            return Ok(());
        }
        Some("print-config") => {
            let config = load_config(args.next().as_deref())?;
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(first.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    fmt().with_max_level(config.tracing_level()?).init();

    info!("Belief Monitor");
    info!("==============");
    info!(event_id = %config.event_id, threshold = config.materiality_threshold, "Configuration loaded");
    match Event::well_known(&config.event_id) {
        Some(event) => info!("Monitoring event: {} ({})", event.name, event.description),
        None => warn!(event_id = %config.event_id, "Event is not a built-in event"),
    }

    match config.database_url.clone() {
        Some(url) => {
            info!("Using Postgres belief store");
            let store = PgStore::connect(&url, config.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            store.initialize().await.context("Failed to initialize tables")?;
            run(Arc::new(store), &config, false).await
        }
        None => {
            info!("No database_url configured, using in-memory store with demo portfolio");
            run(Arc::new(InMemoryStore::new()), &config, true).await
        }
    }
}

/// Refresh beliefs and print the portfolio views.
///
/// With `seed_demo` the store is filled with the demo portfolio over
/// `demo::ROUNDS` rounds. Otherwise only entities that already have beliefs
/// are refreshed, once, from the signals stored for them.
async fn run<S>(store: Arc<S>, config: &MonitorConfig, seed_demo: bool) -> Result<()>
where
    S: BeliefStore + ProposalStore + SignalStore + 'static,
{
    let registry = Arc::new(AgentRegistry::with_default_agents());
    info!(agents = ?registry.descriptors(), "Agents registered");

    let pipeline = BeliefPipeline::new(
        registry,
        ChangeDetector::new(config.detector_config()),
        store.clone(),
        config.pipeline_config(),
    );
    let monitor = BeliefMonitor::from_config(store.clone(), config);
    let event_id = config.event_id.as_str();

    if seed_demo {
        // Rounds one second apart, the last one now
        let start = Utc::now() - Duration::seconds(demo::ROUNDS as i64 - 1);
        for round in 0..demo::ROUNDS {
            let as_of = start + Duration::seconds(round as i64);
            info!("\n=== Refresh round {} ===", round + 1);

            for signal in demo::round_signals(round, as_of)? {
                store.insert_signal(&signal).await?;
            }
            let batch = stored_batch(store.as_ref(), demo::entity_ids()).await?;
            refresh_round(&pipeline, event_id, &batch, as_of).await;
        }
    } else {
        let entity_ids = store.entities_with_beliefs(event_id).await?;
        if entity_ids.is_empty() {
            info!(event_id = %event_id, "No stored beliefs to refresh");
        } else {
            let batch = stored_batch(store.as_ref(), entity_ids.iter()).await?;
            refresh_round(&pipeline, event_id, &batch, Utc::now()).await;
        }
    }

    print_json("Alerts", &monitor.portfolio_alerts(event_id).await?)?;
    print_json("Suggestions", &monitor.portfolio_suggestions(event_id).await?)?;

    let overview = monitor.portfolio_overview(event_id).await?;
    print_json("Portfolio overview", &overview)?;

    if let Some(item) = overview.first() {
        let explanation = monitor.explain_belief(event_id, &item.entity_id).await?;
        print_json("Explanation", &explanation)?;
    }

    Ok(())
}

/// Signals already stored for each entity
async fn stored_batch<S, I>(store: &S, entity_ids: I) -> Result<Vec<EntitySignals>>
where
    S: SignalStore,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut batch = Vec::new();
    for entity_id in entity_ids {
        let entity_id = entity_id.as_ref();
        let signals = store.get_signals(entity_id).await?;
        batch.push(EntitySignals::new(entity_id, signals));
    }
    Ok(batch)
}

async fn refresh_round(pipeline: &BeliefPipeline, event_id: &str, batch: &[EntitySignals], as_of: DateTime<Utc>) {
    for (entity_id, result) in pipeline.refresh_many(event_id, batch, as_of).await {
        match result {
            Ok(Some(update)) => info!(
                "{}: {} ({} confidence, {})",
                entity_id, update.snapshot.probability, update.snapshot.confidence, update.change.change_type
            ),
            Ok(None) => warn!(entity_id = %entity_id, "No agent produced a proposal"),
            Err(e) => warn!(entity_id = %entity_id, error = %e, "Refresh failed"),
        }
    }
}

fn print_json<T: Serialize>(label: &str, value: &T) -> Result<()> {
    println!("=== {} ===", label);
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
