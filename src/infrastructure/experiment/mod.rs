//! Experiment engine components: planning, allocation, evaluation, decision,
//! and in-memory persistence

pub mod allocator;
pub mod decision;
pub mod evaluator;
pub mod in_memory_repository;
pub mod metrics_store;
pub mod planner;
pub mod statistics;

pub use allocator::VariantAllocator;
pub use decision::DecisionEngine;
pub use evaluator::SignificanceEvaluator;
pub use in_memory_repository::InMemoryExperimentRepository;
pub use metrics_store::InMemoryMetricsStore;
pub use planner::{StatisticalPlanner, StatisticsConfig};
