// Change Detector
// Classifies the transition between a snapshot and its immediate predecessor

use common::{BeliefSnapshot, ChangeType};
use serde::{Deserialize, Serialize};

/// Minimum absolute probability move that counts as material (10 points)
pub const DEFAULT_MATERIALITY_THRESHOLD: f64 = 0.1;

// Absorbs binary rounding so decimal boundaries like 0.6 -> 0.5 still count
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Configuration for change detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDetectorConfig {
    /// Symmetric threshold for both drops and rises. The single knob for
    /// what counts as a material change.
    pub materiality_threshold: f64,
}

impl Default for ChangeDetectorConfig {
    fn default() -> Self {
        Self {
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
        }
    }
}

/// Result of comparing two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefChange {
    pub change_type: ChangeType,
    /// `current - previous`; absent for an initial belief
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: ChangeDetectorConfig,
}

impl ChangeDetector {
    pub fn new(config: ChangeDetectorConfig) -> Self {
        Self { config }
    }

    pub fn threshold(&self) -> f64 {
        self.config.materiality_threshold
    }

    /// Total over every (current, previous) pair: exactly one class, no errors.
    pub fn detect(&self, current: &BeliefSnapshot, previous: Option<&BeliefSnapshot>) -> BeliefChange {
        let Some(previous) = previous else {
            return BeliefChange {
                change_type: ChangeType::Initial,
                delta: None,
            };
        };

        let delta = current.probability.value() - previous.probability.value();
        BeliefChange {
            change_type: self.classify_delta(delta),
            delta: Some(delta),
        }
    }

    /// Inclusive on both sides: `delta <= -threshold` is a drop and
    /// `delta >= threshold` is a rise.
    pub fn classify_delta(&self, delta: f64) -> ChangeType {
        let threshold = self.config.materiality_threshold;
        if delta < 0.0 && -delta + BOUNDARY_TOLERANCE >= threshold {
            ChangeType::SignificantDrop
        } else if delta > 0.0 && delta + BOUNDARY_TOLERANCE >= threshold {
            ChangeType::SignificantRise
        } else {
            ChangeType::NoMaterialChange
        }
    }
}
