//! Application state for shared services

use std::sync::Arc;

use crate::domain::experiment::{
    ExperimentQuery, ExperimentRepository, MetricsStore, VariantAllocation,
};
use crate::domain::{
    DomainError, Experiment, LifecycleAction, MetricEvent, VariantMetrics,
};
use crate::infrastructure::services::{
    CreateExperimentRequest, ExperimentOverview, ExperimentService,
};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub experiment_service: Arc<dyn ExperimentServiceTrait>,
}

impl AppState {
    /// Create new application state with the provided service
    pub fn new(experiment_service: Arc<dyn ExperimentServiceTrait>) -> Self {
        Self { experiment_service }
    }
}

/// Trait for experiment service operations
#[async_trait::async_trait]
pub trait ExperimentServiceTrait: Send + Sync {
    async fn create(&self, request: CreateExperimentRequest) -> Result<Experiment, DomainError>;
    async fn get(&self, id: &str) -> Result<Option<Experiment>, DomainError>;
    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError>;
    async fn delete(&self, id: &str) -> Result<bool, DomainError>;
    async fn apply_action(
        &self,
        id: &str,
        action: LifecycleAction,
    ) -> Result<Experiment, DomainError>;
    async fn record_event(
        &self,
        id: &str,
        variant_id: &str,
        event: MetricEvent,
        amount_micros: u64,
    ) -> Result<VariantMetrics, DomainError>;
    async fn reset_metrics(&self, id: &str, variant_id: &str) -> Result<(), DomainError>;
    async fn overview(&self, id: &str) -> Result<ExperimentOverview, DomainError>;
    async fn allocations(&self, id: &str) -> Result<Vec<VariantAllocation>, DomainError>;
}

#[async_trait::async_trait]
impl<R, M> ExperimentServiceTrait for ExperimentService<R, M>
where
    R: ExperimentRepository + 'static,
    M: MetricsStore + 'static,
{
    async fn create(&self, request: CreateExperimentRequest) -> Result<Experiment, DomainError> {
        ExperimentService::create(self, request).await
    }

    async fn get(&self, id: &str) -> Result<Option<Experiment>, DomainError> {
        ExperimentService::get(self, id).await
    }

    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError> {
        ExperimentService::list(self, query).await
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        ExperimentService::delete(self, id).await
    }

    async fn apply_action(
        &self,
        id: &str,
        action: LifecycleAction,
    ) -> Result<Experiment, DomainError> {
        ExperimentService::apply_action(self, id, action).await
    }

    async fn record_event(
        &self,
        id: &str,
        variant_id: &str,
        event: MetricEvent,
        amount_micros: u64,
    ) -> Result<VariantMetrics, DomainError> {
        ExperimentService::record_event(self, id, variant_id, event, amount_micros).await
    }

    async fn reset_metrics(&self, id: &str, variant_id: &str) -> Result<(), DomainError> {
        ExperimentService::reset_metrics(self, id, variant_id).await
    }

    async fn overview(&self, id: &str) -> Result<ExperimentOverview, DomainError> {
        ExperimentService::overview(self, id).await
    }

    async fn allocations(&self, id: &str) -> Result<Vec<VariantAllocation>, DomainError> {
        ExperimentService::allocations(self, id).await
    }
}
