// Demo portfolio used when no database is configured

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{Signal, SignalValue};
use uuid::Uuid;

pub const ROUNDS: usize = 2;

const SOURCE: &str = "demo_feed";

// (runway_months, burn_rate, hiring_signal) per round
type Observation = (f64, bool, bool);

const PORTFOLIO: &[(&str, [Observation; ROUNDS])] = &[
    // 0.60 -> 0.35
    ("acme-robotics", [(14.0, false, false), (4.0, true, false)]),
    // 0.30 -> 0.60
    ("globex-energy", [(5.0, true, true), (18.0, false, false)]),
    ("initech", [(9.0, false, true), (8.0, false, true)]),
    ("umbrella-bio", [(3.0, true, true), (2.0, true, true)]),
];

pub fn entity_ids() -> impl Iterator<Item = &'static str> {
    PORTFOLIO.iter().map(|(id, _)| *id)
}

/// Signals observed for every demo entity in `round`
pub fn round_signals(round: usize, observed_at: DateTime<Utc>) -> Result<Vec<Signal>> {
    let mut signals = Vec::new();
    for (entity_id, rounds) in PORTFOLIO {
        let (runway, burn, hiring) = rounds
            .get(round)
            .copied()
            .with_context(|| format!("No demo round {}", round))?;

        for (signal_type, value) in [
            ("runway_months", SignalValue::Number(runway)),
            ("burn_rate", SignalValue::Bool(burn)),
            ("hiring_signal", SignalValue::Bool(hiring)),
        ] {
            let signal = Signal::new(
                Uuid::new_v4().to_string(),
                *entity_id,
                signal_type,
                value,
                observed_at,
                SOURCE,
            )
            .with_context(|| format!("Invalid demo signal {} for {}", signal_type, entity_id))?;
            signals.push(signal);
        }
    }
    Ok(signals)
}
