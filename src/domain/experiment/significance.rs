//! Significance evaluation result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommended action produced by the decision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Not enough data yet, or not significant yet
    ContinueTest,
    /// A variant cleared the confidence bar with the required sample
    DeclareWinner,
    /// Sample target reached but no variant cleared the bar
    StopInconclusive,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinueTest => write!(f, "continue_test"),
            Self::DeclareWinner => write!(f, "declare_winner"),
            Self::StopInconclusive => write!(f, "stop_inconclusive"),
        }
    }
}

/// Reason codes attached to a non-significant result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignificanceReason {
    /// A variant has zero observations for the success metric; no test was run
    InsufficientData,
    /// One or more variants have not reached the planned sample size
    SampleTargetNotReached,
    /// Sample targets reached but no variant cleared the confidence bar
    BelowConfidenceBar,
}

/// Pairwise comparison of one variant against the control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantComparison {
    pub variant_id: String,
    /// Conversion rate observed for this variant
    pub conversion_rate: f64,
    /// Sample size (impressions) accumulated by this variant
    pub sample_size: u64,
    /// Confidence (percent) that this variant differs from the control,
    /// from a two-proportion z-test
    pub confidence: f64,
    /// Whether this variant reached the plan's per-variant sample size
    pub sample_reached: bool,
}

/// Experiment-level significance result. Either produced whole or not at all;
/// a partial result is never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub control_variant_id: String,
    /// Conversion rate of the control variant
    pub control_conversion_rate: f64,
    /// One comparison per non-control variant, in config order
    pub comparisons: Vec<VariantComparison>,
    pub is_significant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_variant: Option<String>,
    /// Winning variant's conversion-rate improvement over control, percent
    pub lift_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SignificanceReason>,
}

impl SignificanceResult {
    /// A result for an experiment that cannot be tested yet
    pub fn insufficient_data(control_variant_id: impl Into<String>) -> Self {
        Self {
            control_variant_id: control_variant_id.into(),
            control_conversion_rate: 0.0,
            comparisons: Vec::new(),
            is_significant: false,
            winning_variant: None,
            lift_percentage: 0.0,
            reason: Some(SignificanceReason::InsufficientData),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(RecommendedAction::ContinueTest.to_string(), "continue_test");
        assert_eq!(
            RecommendedAction::DeclareWinner.to_string(),
            "declare_winner"
        );
        assert_eq!(
            RecommendedAction::StopInconclusive.to_string(),
            "stop_inconclusive"
        );
    }

    #[test]
    fn test_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&SignificanceReason::InsufficientData).unwrap(),
            "\"insufficient-data\""
        );
    }

    #[test]
    fn test_insufficient_data_result() {
        let result = SignificanceResult::insufficient_data("control");
        assert!(!result.is_significant);
        assert!(result.winning_variant.is_none());
        assert_eq!(result.reason, Some(SignificanceReason::InsufficientData));
    }
}
