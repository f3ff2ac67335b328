//! Experiment configuration validation
//!
//! ID validation fails fast with a typed error; whole-config validation
//! collects every violation so an operator sees all problems in one pass.

use thiserror::Error;

use super::entity::ExperimentConfig;

/// Maximum length for experiment IDs
pub const MAX_EXPERIMENT_ID_LENGTH: usize = 50;

/// Maximum length for variant IDs
pub const MAX_VARIANT_ID_LENGTH: usize = 50;

/// Tolerance when checking that traffic splits sum to 100
pub const SPLIT_SUM_TOLERANCE: f64 = 0.01;

/// Validation errors for experiment and variant identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExperimentValidationError {
    #[error("Experiment ID cannot be empty")]
    EmptyId,

    #[error("Experiment ID exceeds maximum length of {0} characters")]
    IdTooLong(usize),

    #[error("Experiment ID must start and end with a letter or number")]
    InvalidIdBoundary,

    #[error("Experiment ID contains invalid character: '{0}'")]
    InvalidIdCharacter(char),

    #[error("Variant ID cannot be empty")]
    EmptyVariantId,

    #[error("Variant ID exceeds maximum length of {0} characters")]
    VariantIdTooLong(usize),

    #[error("Variant ID must start and end with a letter or number")]
    InvalidVariantIdBoundary,

    #[error("Variant ID contains invalid character: '{0}'")]
    InvalidVariantIdCharacter(char),
}

/// Validate an experiment ID (kebab-case, alphanumeric with single hyphens)
pub fn validate_experiment_id(id: &str) -> Result<(), ExperimentValidationError> {
    if id.is_empty() {
        return Err(ExperimentValidationError::EmptyId);
    }

    if id.len() > MAX_EXPERIMENT_ID_LENGTH {
        return Err(ExperimentValidationError::IdTooLong(MAX_EXPERIMENT_ID_LENGTH));
    }

    if !id.starts_with(|c: char| c.is_ascii_alphanumeric())
        || !id.ends_with(|c: char| c.is_ascii_alphanumeric())
    {
        return Err(ExperimentValidationError::InvalidIdBoundary);
    }

    let mut prev_was_hyphen = false;

    for ch in id.chars() {
        if ch == '-' {
            if prev_was_hyphen {
                return Err(ExperimentValidationError::InvalidIdCharacter(ch));
            }
            prev_was_hyphen = true;
        } else if ch.is_ascii_alphanumeric() {
            prev_was_hyphen = false;
        } else {
            return Err(ExperimentValidationError::InvalidIdCharacter(ch));
        }
    }

    Ok(())
}

/// Validate a variant ID (same shape as experiment IDs)
pub fn validate_variant_id(id: &str) -> Result<(), ExperimentValidationError> {
    if id.is_empty() {
        return Err(ExperimentValidationError::EmptyVariantId);
    }

    if id.len() > MAX_VARIANT_ID_LENGTH {
        return Err(ExperimentValidationError::VariantIdTooLong(
            MAX_VARIANT_ID_LENGTH,
        ));
    }

    if !id.starts_with(|c: char| c.is_ascii_alphanumeric())
        || !id.ends_with(|c: char| c.is_ascii_alphanumeric())
    {
        return Err(ExperimentValidationError::InvalidVariantIdBoundary);
    }

    let mut prev_was_hyphen = false;

    for ch in id.chars() {
        if ch == '-' {
            if prev_was_hyphen {
                return Err(ExperimentValidationError::InvalidVariantIdCharacter(ch));
            }
            prev_was_hyphen = true;
        } else if ch.is_ascii_alphanumeric() {
            prev_was_hyphen = false;
        } else {
            return Err(ExperimentValidationError::InvalidVariantIdCharacter(ch));
        }
    }

    Ok(())
}

// ============================================================================
// ValidationResult / config validation
// ============================================================================

/// Outcome of whole-config validation. All violations are collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

/// Validate an experiment configuration, collecting every violation.
///
/// Never fails for well-typed input; problems are signalled only through the
/// returned error list.
pub fn validate_config(config: &ExperimentConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.campaign_id.trim().is_empty() {
        result.push("Campaign ID is required");
    }

    if config.name.trim().len() < 3 {
        result.push("Test name must be at least 3 characters long");
    }

    if config.variants.len() < 2 {
        result.push("At least 2 variants are required for A/B testing");
    }

    if !config.variants.is_empty() {
        let total_split: f64 = config.variants.iter().map(|v| v.traffic_split()).sum();

        if (total_split - 100.0).abs() > SPLIT_SUM_TOLERANCE {
            result.push(format!(
                "Traffic split must total 100%, got {}",
                total_split
            ));
        }

        let mut seen = std::collections::HashSet::new();

        for variant in &config.variants {
            if !seen.insert(variant.id().as_str()) {
                result.push(format!("Duplicate variant ID: '{}'", variant.id()));
            }
        }
    }

    if config.duration_days < 1 {
        result.push("Test duration must be at least 1 day");
    }

    if config.success_metrics.is_empty() {
        result.push("At least one success metric is required");
    }

    let confidence = config.statistical_settings.confidence_level;

    if !(80.0..=99.0).contains(&confidence) {
        result.push("Confidence level must be between 80% and 99%");
    }

    if config.statistical_settings.minimum_detectable_effect <= 0.0 {
        result.push("Minimum detectable effect must be greater than 0%");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::entity::{
        StatisticalSettings, SuccessMetric, VariantId, VariantSpec,
    };

    fn valid_config() -> ExperimentConfig {
        ExperimentConfig {
            campaign_id: "camp-123".to_string(),
            name: "Creative test".to_string(),
            hypothesis: "B beats A".to_string(),
            variants: vec![
                VariantSpec::new(VariantId::new("control").unwrap(), "Control", 50.0),
                VariantSpec::new(VariantId::new("variant-b").unwrap(), "Variant B", 50.0),
            ],
            duration_days: 14,
            success_metrics: vec![SuccessMetric {
                metric: "conversions".to_string(),
                target: 50.0,
                weight: 1.0,
            }],
            statistical_settings: StatisticalSettings {
                confidence_level: 95.0,
                minimum_sample_size: 100,
                minimum_detectable_effect: 10.0,
            },
        }
    }

    mod id_validation {
        use super::*;

        #[test]
        fn test_valid_experiment_ids() {
            assert!(validate_experiment_id("exp-1").is_ok());
            assert!(validate_experiment_id("summer-sale-2025").is_ok());
            assert!(validate_experiment_id("a").is_ok());
        }

        #[test]
        fn test_invalid_experiment_ids() {
            assert_eq!(
                validate_experiment_id(""),
                Err(ExperimentValidationError::EmptyId)
            );
            assert_eq!(
                validate_experiment_id(&"a".repeat(51)),
                Err(ExperimentValidationError::IdTooLong(50))
            );
            assert_eq!(
                validate_experiment_id("-abc"),
                Err(ExperimentValidationError::InvalidIdBoundary)
            );
            assert_eq!(
                validate_experiment_id("abc-"),
                Err(ExperimentValidationError::InvalidIdBoundary)
            );
            assert_eq!(
                validate_experiment_id("ab_cd"),
                Err(ExperimentValidationError::InvalidIdCharacter('_'))
            );
            assert_eq!(
                validate_experiment_id("ab--cd"),
                Err(ExperimentValidationError::InvalidIdCharacter('-'))
            );
        }

        #[test]
        fn test_valid_variant_ids() {
            assert!(validate_variant_id("control").is_ok());
            assert!(validate_variant_id("new-creative").is_ok());
        }

        #[test]
        fn test_invalid_variant_ids() {
            assert_eq!(
                validate_variant_id(""),
                Err(ExperimentValidationError::EmptyVariantId)
            );
            assert_eq!(
                validate_variant_id("-x"),
                Err(ExperimentValidationError::InvalidVariantIdBoundary)
            );
        }
    }

    mod config_validation {
        use super::*;

        #[test]
        fn test_valid_config() {
            let result = validate_config(&valid_config());
            assert!(result.is_valid(), "unexpected errors: {:?}", result.errors());
        }

        #[test]
        fn test_invalid_split_lists_only_split_error() {
            let mut config = valid_config();
            config.variants = vec![
                VariantSpec::new(VariantId::new("control").unwrap(), "Control", 60.0),
                VariantSpec::new(VariantId::new("variant-b").unwrap(), "Variant B", 60.0),
            ];

            let result = validate_config(&config);
            assert!(!result.is_valid());
            assert_eq!(result.errors().len(), 1);
            assert!(result.errors()[0].contains("Traffic split must total 100%"));
        }

        #[test]
        fn test_split_within_tolerance_accepted() {
            let mut config = valid_config();
            config.variants = vec![
                VariantSpec::new(VariantId::new("control").unwrap(), "Control", 50.005),
                VariantSpec::new(VariantId::new("variant-b").unwrap(), "Variant B", 49.999),
            ];

            assert!(validate_config(&config).is_valid());
        }

        #[test]
        fn test_short_name() {
            let mut config = valid_config();
            config.name = "ab".to_string();

            let result = validate_config(&config);
            assert!(result
                .errors()
                .iter()
                .any(|e| e.contains("at least 3 characters")));
        }

        #[test]
        fn test_single_variant() {
            let mut config = valid_config();
            config.variants.truncate(1);
            config.variants[0] = VariantSpec::new(
                VariantId::new("control").unwrap(),
                "Control",
                100.0,
            );

            let result = validate_config(&config);
            assert!(result
                .errors()
                .iter()
                .any(|e| e.contains("At least 2 variants")));
        }

        #[test]
        fn test_duplicate_variant_ids() {
            let mut config = valid_config();
            config.variants = vec![
                VariantSpec::new(VariantId::new("control").unwrap(), "Control", 50.0),
                VariantSpec::new(VariantId::new("control").unwrap(), "Control 2", 50.0),
            ];

            let result = validate_config(&config);
            assert!(result
                .errors()
                .iter()
                .any(|e| e.contains("Duplicate variant ID")));
        }

        #[test]
        fn test_zero_duration() {
            let mut config = valid_config();
            config.duration_days = 0;

            let result = validate_config(&config);
            assert!(result
                .errors()
                .iter()
                .any(|e| e.contains("at least 1 day")));
        }

        #[test]
        fn test_no_success_metrics() {
            let mut config = valid_config();
            config.success_metrics.clear();

            let result = validate_config(&config);
            assert!(result
                .errors()
                .iter()
                .any(|e| e.contains("success metric")));
        }

        #[test]
        fn test_confidence_out_of_range() {
            for confidence in [79.9, 99.1, 0.0, 120.0] {
                let mut config = valid_config();
                config.statistical_settings.confidence_level = confidence;

                let result = validate_config(&config);
                assert!(
                    result
                        .errors()
                        .iter()
                        .any(|e| e.contains("Confidence level")),
                    "confidence {} should be rejected",
                    confidence
                );
            }
        }

        #[test]
        fn test_non_positive_mde_rejected() {
            for mde in [0.0, -5.0] {
                let mut config = valid_config();
                config.statistical_settings.minimum_detectable_effect = mde;

                let result = validate_config(&config);
                assert!(
                    result
                        .errors()
                        .iter()
                        .any(|e| e.contains("detectable effect")),
                    "mde {} should be rejected",
                    mde
                );
            }
        }

        #[test]
        fn test_all_violations_collected() {
            let config = ExperimentConfig {
                campaign_id: "".to_string(),
                name: "ab".to_string(),
                hypothesis: "".to_string(),
                variants: vec![],
                duration_days: 0,
                success_metrics: vec![],
                statistical_settings: StatisticalSettings {
                    confidence_level: 50.0,
                    minimum_sample_size: 0,
                    minimum_detectable_effect: 10.0,
                },
            };

            let result = validate_config(&config);
            assert_eq!(result.errors().len(), 6);
        }
    }
}
