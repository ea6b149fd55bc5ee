use crate::error::ModelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed value carried by a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SignalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SignalValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Only a boolean `true` counts; numbers and text never do.
    pub fn is_true(&self) -> bool {
        matches!(self, SignalValue::Bool(true))
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            SignalValue::Bool(_) => ValueShape::Boolean,
            SignalValue::Number(_) => ValueShape::Number,
            SignalValue::Text(_) => ValueShape::Text,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Bool(b) => write!(f, "{}", b),
            SignalValue::Number(n) => write!(f, "{}", n),
            SignalValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Boolean,
    Number,
    Text,
}

impl ValueShape {
    /// Shape required for the signal types the scoring agents understand.
    /// Unknown types accept any shape.
    pub fn expected_for(signal_type: &str) -> Option<ValueShape> {
        match signal_type {
            "runway_months" => Some(ValueShape::Number),
            "burn_rate" | "hiring_signal" => Some(ValueShape::Boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueShape::Boolean => "boolean",
            ValueShape::Number => "numeric",
            ValueShape::Text => "text",
        }
    }
}

/// Immutable observed fact about an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSignal")]
pub struct Signal {
    signal_id: String,
    entity_id: String,
    signal_type: String,
    value: SignalValue,
    timestamp: DateTime<Utc>,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence_hint: Option<f64>,
}

impl Signal {
    pub fn new(
        signal_id: impl Into<String>,
        entity_id: impl Into<String>,
        signal_type: impl Into<String>,
        value: SignalValue,
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let signal = Self {
            signal_id: signal_id.into(),
            entity_id: entity_id.into(),
            signal_type: signal_type.into(),
            value,
            timestamp,
            source: source.into(),
            confidence_hint: None,
        };
        signal.check_shape()?;
        Ok(signal)
    }

    pub fn with_confidence_hint(mut self, hint: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&hint) {
            return Err(ModelError::InvalidConfidenceHint {
                signal_id: self.signal_id,
                value: hint,
            });
        }
        self.confidence_hint = Some(hint);
        Ok(self)
    }

    fn check_shape(&self) -> Result<(), ModelError> {
        let Some(expected) = ValueShape::expected_for(&self.signal_type) else {
            return Ok(());
        };
        let finite = !matches!(self.value, SignalValue::Number(n) if !n.is_finite());
        if self.value.shape() != expected || !finite {
            return Err(ModelError::WrongValueShape {
                signal_id: self.signal_id.clone(),
                signal_type: self.signal_type.clone(),
                expected: expected.as_str(),
            });
        }
        Ok(())
    }

    pub fn signal_id(&self) -> &str {
        &self.signal_id
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn signal_type(&self) -> &str {
        &self.signal_type
    }

    pub fn value(&self) -> &SignalValue {
        &self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn confidence_hint(&self) -> Option<f64> {
        self.confidence_hint
    }
}

#[derive(Deserialize)]
struct RawSignal {
    signal_id: String,
    entity_id: String,
    signal_type: String,
    value: SignalValue,
    timestamp: DateTime<Utc>,
    source: String,
    #[serde(default)]
    confidence_hint: Option<f64>,
}

impl TryFrom<RawSignal> for Signal {
    type Error = ModelError;

    fn try_from(raw: RawSignal) -> Result<Self, Self::Error> {
        let signal = Signal::new(
            raw.signal_id,
            raw.entity_id,
            raw.signal_type,
            raw.value,
            raw.timestamp,
            raw.source,
        )?;
        match raw.confidence_hint {
            Some(hint) => signal.with_confidence_hint(hint),
            None => Ok(signal),
        }
    }
}
