//! Statistical planner: sample-size and duration requirements
//!
//! Implements the standard two-proportion sample-size formula
//! `n = 2 * (z_alpha + z_beta)^2 * p * (1 - p) / (mde * p)^2`
//! against a configurable baseline conversion rate and traffic assumption.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::statistics::z_score_for;
use crate::domain::experiment::{ExperimentConfig, StatisticalPlan};

/// Planning assumptions. These are deployment-level knobs, not per-experiment
/// settings; the per-experiment inputs come from the config's statistical
/// settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Assumed baseline conversion rate for sample-size planning
    pub baseline_conversion_rate: f64,
    /// Assumed daily traffic per variant, used to estimate duration
    pub assumed_daily_traffic: u64,
    /// Statistical power target
    pub power: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            baseline_conversion_rate: 0.02,
            assumed_daily_traffic: 1000,
            power: 0.8,
        }
    }
}

/// Derives a [`StatisticalPlan`] from an experiment configuration
#[derive(Debug, Clone, Default)]
pub struct StatisticalPlanner {
    config: StatisticsConfig,
}

impl StatisticalPlanner {
    pub fn new(config: StatisticsConfig) -> Self {
        Self { config }
    }

    /// Compute the plan for a configuration.
    ///
    /// The per-variant requirement is the formula output floored by the
    /// config's minimum sample size. The duration estimate uses the raw
    /// formula output so it reflects the statistical design rather than the
    /// operator's floor.
    pub fn plan(&self, config: &ExperimentConfig) -> StatisticalPlan {
        let settings = &config.statistical_settings;

        let alpha = 1.0 - settings.confidence_level / 100.0;
        let z_alpha = z_score_for(1.0 - alpha / 2.0);
        let z_beta = z_score_for(self.config.power);

        let p = self.config.baseline_conversion_rate;
        let effect = settings.minimum_detectable_effect / 100.0;

        let numerator = 2.0 * (z_alpha + z_beta).powi(2) * p * (1.0 - p);
        let denominator = (effect * p).powi(2);
        let formula_sample = (numerator / denominator).ceil() as u64;

        let required_sample_per_variant = formula_sample.max(settings.minimum_sample_size);
        let total_required_sample =
            required_sample_per_variant * config.variants.len() as u64;

        // The traffic assumption comes from deployment config; a zero there
        // must not divide the estimate by zero
        let daily_traffic = self.config.assumed_daily_traffic.max(1);
        let estimated_duration_days = formula_sample.div_ceil(daily_traffic).max(1) as u32;

        debug!(
            campaign_id = %config.campaign_id,
            formula_sample,
            required_sample_per_variant,
            estimated_duration_days,
            "Computed statistical plan"
        );

        StatisticalPlan {
            required_sample_per_variant,
            total_required_sample,
            estimated_duration_days,
            confidence_level: settings.confidence_level,
            minimum_detectable_effect: settings.minimum_detectable_effect,
            power: self.config.power,
        }
    }
}
