// Belief Aggregator
// Combines every current proposal for one (event, entity) pair

use common::{Confidence, ConfidenceInterval, ForecastProposal, Probability};
use serde::Serialize;

/// Outcome of aggregating a proposal set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregatedBelief {
    pub probability: Probability,
    pub confidence: Confidence,
    pub proposal_count: usize,
}

impl AggregatedBelief {
    /// True for the empty-input sentinel (probability 0.0, low confidence).
    /// Callers must not persist it as a real belief.
    pub fn is_empty(&self) -> bool {
        self.proposal_count == 0
    }
}

/// Unweighted mean of the proposed probabilities.
///
/// Confidence follows the proposal count: two or more is high, one is medium,
/// none is low.
pub fn aggregate(proposals: &[ForecastProposal]) -> AggregatedBelief {
    if proposals.is_empty() {
        return AggregatedBelief {
            probability: Probability::ZERO,
            confidence: Confidence::Low,
            proposal_count: 0,
        };
    }

    let count = proposals.len();
    let total: f64 = proposals.iter().map(|p| p.proposed_probability.value()).sum();

    AggregatedBelief {
        // Mean of values in [0, 1] stays in range; clamping only absorbs rounding
        probability: Probability::clamped(total / count as f64),
        confidence: Confidence::from_proposal_count(count),
        proposal_count: count,
    }
}

/// Lowest and highest proposed probability; `None` for fewer than two proposals
pub fn proposal_spread(proposals: &[ForecastProposal]) -> Option<ConfidenceInterval> {
    if proposals.len() < 2 {
        return None;
    }
    let values = proposals.iter().map(|p| p.proposed_probability.value());
    let low = values.clone().fold(f64::INFINITY, f64::min);
    let high = values.fold(f64::NEG_INFINITY, f64::max);
    ConfidenceInterval::new(low, high).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn proposal(agent: &str, p: f64) -> ForecastProposal {
        ForecastProposal::new(agent, "E", "acme", Probability::new(p).unwrap(), "test", Utc::now())
    }

    #[test]
    fn test_two_proposals_high_confidence() {
        let result = aggregate(&[proposal("a", 0.7), proposal("b", 0.5)]);
        assert!((result.probability.value() - 0.6).abs() < 1e-12);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.proposal_count, 2);
    }

    #[test]
    fn test_single_proposal_medium_confidence() {
        let result = aggregate(&[proposal("a", 0.35)]);
        assert_eq!(result.probability.value(), 0.35);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_empty_sentinel() {
        let result = aggregate(&[]);
        assert!(result.is_empty());
        assert_eq!(result.probability.value(), 0.0);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_unweighted_mean() {
        // Same agent twice counts twice; there is no reputation weighting
        let result = aggregate(&[proposal("a", 0.9), proposal("a", 0.9), proposal("b", 0.0)]);
        assert!((result.probability.value() - 0.6).abs() < 1e-12);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_spread_needs_two_proposals() {
        assert!(proposal_spread(&[proposal("a", 0.4)]).is_none());

        let spread = proposal_spread(&[proposal("a", 0.7), proposal("b", 0.3), proposal("c", 0.5)]).unwrap();
        assert_eq!(spread.low().value(), 0.3);
        assert_eq!(spread.high().value(), 0.7);
    }
}
