//! Statistical plan derived from an experiment configuration
//!
//! The plan is recomputed whenever the configuration is validated and is
//! treated as read-only output; it is never edited directly.

use serde::{Deserialize, Serialize};

/// Sample-size and duration requirements for an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalPlan {
    /// Required sample size per variant, after applying the configured
    /// minimum-sample-size floor
    pub required_sample_per_variant: u64,
    /// Required sample size across all variants
    pub total_required_sample: u64,
    /// Estimated days to collect the formula's per-variant sample at the
    /// assumed daily traffic rate
    pub estimated_duration_days: u32,
    /// Echoed confidence level (percent)
    pub confidence_level: f64,
    /// Echoed minimum detectable effect (percent)
    pub minimum_detectable_effect: f64,
    /// Statistical power used by the design (fixed target, e.g. 0.8)
    pub power: f64,
}

impl StatisticalPlan {
    /// Check whether a variant's accumulated sample meets the per-variant
    /// requirement
    pub fn sample_reached(&self, sample_size: u64) -> bool {
        sample_size >= self.required_sample_per_variant
    }
}
