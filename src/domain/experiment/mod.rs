//! Experiment domain: entities, validation, plan/allocation/metrics value
//! types, and repository traits

pub mod allocation;
pub mod entity;
pub mod metrics;
pub mod plan;
pub mod repository;
pub mod significance;
pub mod validation;

pub use allocation::{AttributionTags, TrackingContract, VariantAllocation};
pub use entity::{
    Experiment, ExperimentConfig, ExperimentId, ExperimentState, LifecycleAction,
    StatisticalSettings, SuccessMetric, VariantId, VariantModifications, VariantSpec,
};
pub use metrics::{MetricEvent, VariantMetrics};
pub use plan::StatisticalPlan;
pub use repository::{ExperimentQuery, ExperimentRepository, MetricsStore};
pub use significance::{
    RecommendedAction, SignificanceReason, SignificanceResult, VariantComparison,
};
pub use validation::{
    validate_config, validate_experiment_id, validate_variant_id, ExperimentValidationError,
    ValidationResult,
};
