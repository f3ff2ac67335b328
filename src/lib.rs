//! PulseBridge Experiments
//!
//! An A/B experiment engine for marketing campaigns with support for:
//! - Configuration validation and statistical sample-size planning
//! - Deterministic traffic allocation with attribution tracking contracts
//! - Atomic per-variant performance counters
//! - Two-proportion significance testing and lifecycle management

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::experiment::{InMemoryExperimentRepository, InMemoryMetricsStore};
use infrastructure::services::ExperimentService;

/// Create the application state with all services initialized
pub fn create_app_state(config: &AppConfig) -> AppState {
    let repository = Arc::new(InMemoryExperimentRepository::new());
    let metrics = Arc::new(InMemoryMetricsStore::new());

    let experiment_service = Arc::new(ExperimentService::new(
        repository,
        metrics,
        config.statistics.clone(),
    ));

    AppState::new(experiment_service)
}
