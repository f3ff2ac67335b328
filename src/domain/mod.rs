//! Domain layer - core business logic and entities

pub mod error;
pub mod experiment;

pub use error::DomainError;
pub use experiment::{
    Experiment, ExperimentConfig, ExperimentId, ExperimentState, LifecycleAction, MetricEvent,
    RecommendedAction, SignificanceResult, StatisticalPlan, VariantId, VariantMetrics,
};
