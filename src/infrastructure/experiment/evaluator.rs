//! Significance evaluator
//!
//! Runs two-proportion z-tests of each variant against the control over a
//! metrics snapshot taken before any computation starts. Counters that move
//! while an evaluation is in flight show up in the next evaluation, never as
//! a torn read inside this one.

use std::collections::BTreeMap;

use tracing::debug;

use super::statistics::{p_value_two_tailed, two_proportion_z};
use crate::domain::experiment::{
    ExperimentConfig, SignificanceReason, SignificanceResult, StatisticalPlan,
    VariantComparison, VariantMetrics,
};
use crate::domain::DomainError;

/// Evaluates experiment significance from a consistent metrics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct SignificanceEvaluator;

impl SignificanceEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a snapshot against the plan.
    ///
    /// Returns an insufficient-data result when any variant has no
    /// impressions or no conversions yet; a z-test over such a snapshot
    /// would divide by zero or compare against an undefined baseline.
    pub fn evaluate(
        &self,
        config: &ExperimentConfig,
        plan: &StatisticalPlan,
        snapshot: &BTreeMap<String, VariantMetrics>,
    ) -> Result<SignificanceResult, DomainError> {
        let control = config
            .control_variant()
            .ok_or_else(|| DomainError::internal("Experiment has no variants"))?;
        let control_id = control.id().as_str();

        let metrics_for = |variant_id: &str| -> VariantMetrics {
            snapshot.get(variant_id).copied().unwrap_or_default()
        };

        let has_insufficient_data = config.variants.iter().any(|v| {
            let m = metrics_for(v.id().as_str());
            m.impressions == 0 || m.conversions == 0
        });
        if has_insufficient_data {
            debug!(control = control_id, "Insufficient data for significance test");
            return Ok(SignificanceResult::insufficient_data(control_id));
        }

        let control_metrics = metrics_for(control_id);
        let control_rate = control_metrics.conversion_rate();
        let control_reached = plan.sample_reached(control_metrics.sample_size());

        let comparisons: Vec<VariantComparison> = config
            .variants
            .iter()
            .skip(1)
            .map(|variant| {
                let metrics = metrics_for(variant.id().as_str());
                let confidence = comparison_confidence(&control_metrics, &metrics);

                VariantComparison {
                    variant_id: variant.id().to_string(),
                    conversion_rate: metrics.conversion_rate(),
                    sample_size: metrics.sample_size(),
                    confidence,
                    sample_reached: plan.sample_reached(metrics.sample_size()),
                }
            })
            .collect();

        let all_reached = control_reached && comparisons.iter().all(|c| c.sample_reached);

        // Winner: the best-converting variant that beats the control and
        // clears the confidence bar, once every arm has its planned sample.
        let winner = if all_reached {
            comparisons
                .iter()
                .filter(|c| c.confidence >= plan.confidence_level)
                .filter(|c| c.conversion_rate > control_rate)
                .max_by(|a, b| a.conversion_rate.total_cmp(&b.conversion_rate))
        } else {
            None
        };

        let (is_significant, winning_variant, lift_percentage, reason) = match winner {
            Some(w) => {
                let lift = (w.conversion_rate - control_rate) / control_rate * 100.0;
                (true, Some(w.variant_id.clone()), lift, None)
            }
            None if !all_reached => (
                false,
                None,
                0.0,
                Some(SignificanceReason::SampleTargetNotReached),
            ),
            None => (
                false,
                None,
                0.0,
                Some(SignificanceReason::BelowConfidenceBar),
            ),
        };

        debug!(
            control = control_id,
            is_significant,
            winner = winning_variant.as_deref().unwrap_or("-"),
            "Evaluated significance"
        );

        Ok(SignificanceResult {
            control_variant_id: control_id.to_string(),
            control_conversion_rate: control_rate,
            comparisons,
            is_significant,
            winning_variant,
            lift_percentage,
            reason,
        })
    }
}

/// Confidence (percent) that a variant differs from the control, from the
/// two-tailed p-value of a pooled two-proportion z-test. Zero when the test
/// cannot be run.
fn comparison_confidence(control: &VariantMetrics, variant: &VariantMetrics) -> f64 {
    match two_proportion_z(
        control.conversions,
        control.sample_size(),
        variant.conversions,
        variant.sample_size(),
    ) {
        Some(z) => (1.0 - p_value_two_tailed(z)) * 100.0,
        None => 0.0,
    }
}
