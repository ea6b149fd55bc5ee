use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A probability in [0, 1]
///
/// The only ways to obtain one are the checked [`Probability::new`] and the
/// saturating [`Probability::clamped`]; deserialization uses the checked path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);
    pub const ONE: Probability = Probability(1.0);

    pub fn new(value: f64) -> Result<Self, ModelError> {
        // NaN fails the range check as well
        if !(0.0..=1.0).contains(&value) {
            return Err(ModelError::ProbabilityOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Saturate into [0, 1]. NaN collapses to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Qualitative confidence attached to a belief
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Confidence implied by how many agents contributed a proposal
    pub fn from_proposal_count(count: usize) -> Self {
        match count {
            0 => Confidence::Low,
            1 => Confidence::Medium,
            _ => Confidence::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(ModelError::UnknownConfidence(other.to_string())),
        }
    }
}

/// Closed interval `[low, high]` of probabilities, serialized as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct ConfidenceInterval {
    low: Probability,
    high: Probability,
}

impl ConfidenceInterval {
    pub fn new(low: f64, high: f64) -> Result<Self, ModelError> {
        let (lo, hi) = match (Probability::new(low), Probability::new(high)) {
            (Ok(lo), Ok(hi)) => (lo, hi),
            _ => return Err(ModelError::InvalidInterval { low, high }),
        };
        if lo > hi {
            return Err(ModelError::InvalidInterval { low, high });
        }
        Ok(Self { low: lo, high: hi })
    }

    pub fn low(&self) -> Probability {
        self.low
    }

    pub fn high(&self) -> Probability {
        self.high
    }

    pub fn contains(&self, p: Probability) -> bool {
        self.low <= p && p <= self.high
    }
}

impl TryFrom<(f64, f64)> for ConfidenceInterval {
    type Error = ModelError;

    fn try_from((low, high): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(low, high)
    }
}

impl From<ConfidenceInterval> for (f64, f64) {
    fn from(ci: ConfidenceInterval) -> Self {
        (ci.low.value(), ci.high.value())
    }
}
