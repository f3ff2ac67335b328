//! Per-variant performance metrics
//!
//! Raw counters are the source of truth; derived rates are computed on read
//! so they can never diverge from the counters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Performance event types accepted by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricEvent {
    Impression,
    Click,
    Conversion,
    Cost,
}

impl fmt::Display for MetricEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Impression => write!(f, "impression"),
            Self::Click => write!(f, "click"),
            Self::Conversion => write!(f, "conversion"),
            Self::Cost => write!(f, "cost"),
        }
    }
}

/// Running counters for one variant. Monotonically non-decreasing for the
/// lifetime of the experiment; corrections go through an explicit reset, never
/// a decrement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// Accumulated spend in micro-dollars
    pub cost_micros: u64,
}

impl VariantMetrics {
    /// Click-through rate: clicks / impressions, 0 when no impressions
    pub fn ctr(&self) -> f64 {
        ratio(self.clicks as f64, self.impressions as f64)
    }

    /// Conversion rate: conversions / impressions, 0 when no impressions
    pub fn conversion_rate(&self) -> f64 {
        ratio(self.conversions as f64, self.impressions as f64)
    }

    /// Cost per click in dollars, 0 when no clicks
    pub fn cpc(&self) -> f64 {
        ratio(self.cost_dollars(), self.clicks as f64)
    }

    /// Cost per acquisition in dollars, 0 when no conversions
    pub fn cpa(&self) -> f64 {
        ratio(self.cost_dollars(), self.conversions as f64)
    }

    /// Accumulated spend in dollars
    pub fn cost_dollars(&self) -> f64 {
        self.cost_micros as f64 / 1_000_000.0
    }

    /// The sample size used for statistical evaluation (impressions, matching
    /// the planner's denominator)
    pub fn sample_size(&self) -> u64 {
        self.impressions
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_denominators_yield_zero() {
        let metrics = VariantMetrics::default();
        assert_eq!(metrics.ctr(), 0.0);
        assert_eq!(metrics.conversion_rate(), 0.0);
        assert_eq!(metrics.cpc(), 0.0);
        assert_eq!(metrics.cpa(), 0.0);
    }

    #[test]
    fn test_derived_rates() {
        let metrics = VariantMetrics {
            impressions: 10_000,
            clicks: 500,
            conversions: 50,
            cost_micros: 1_000_000_000, // $1000
        };

        assert!((metrics.ctr() - 0.05).abs() < 1e-9);
        assert!((metrics.conversion_rate() - 0.005).abs() < 1e-9);
        assert!((metrics.cpc() - 2.0).abs() < 1e-9);
        assert!((metrics.cpa() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_event_serialization() {
        let event: MetricEvent = serde_json::from_str("\"impression\"").unwrap();
        assert_eq!(event, MetricEvent::Impression);
        assert_eq!(
            serde_json::to_string(&MetricEvent::Conversion).unwrap(),
            "\"conversion\""
        );
    }
}
