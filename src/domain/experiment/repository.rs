//! Repository and metrics-store traits
//!
//! Persistence and counter storage are injected collaborators; the engine
//! itself never owns ambient global state.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;

use super::entity::{Experiment, ExperimentId, ExperimentState};
use super::metrics::{MetricEvent, VariantMetrics};
use crate::domain::DomainError;

// ============================================================================
// ExperimentQuery
// ============================================================================

/// Query parameters for listing experiments
#[derive(Debug, Clone, Default)]
pub struct ExperimentQuery {
    /// Filter by lifecycle state
    pub state: Option<ExperimentState>,
    /// Filter by campaign ID
    pub campaign_id: Option<String>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Number of results to skip
    pub offset: Option<usize>,
}

impl ExperimentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: ExperimentState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

// ============================================================================
// ExperimentRepository
// ============================================================================

/// Repository trait for experiment aggregates.
///
/// `update` performs an optimistic-concurrency check: the caller passes the
/// aggregate it loaded, and the write is rejected with a conflict error if the
/// stored version has moved on since that load.
#[async_trait]
pub trait ExperimentRepository: Send + Sync + Debug {
    /// Create a new experiment
    async fn create(&self, experiment: Experiment) -> Result<Experiment, DomainError>;

    /// Get an experiment by ID
    async fn get(&self, id: &ExperimentId) -> Result<Option<Experiment>, DomainError>;

    /// Update an existing experiment if its version still matches the store
    async fn update(&self, experiment: Experiment) -> Result<Experiment, DomainError>;

    /// Delete an experiment by ID
    async fn delete(&self, id: &ExperimentId) -> Result<bool, DomainError>;

    /// List experiments with optional filters
    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError>;

    /// Check if an experiment exists
    async fn exists(&self, id: &ExperimentId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }

    /// Count experiments matching the query
    async fn count(&self, query: &ExperimentQuery) -> Result<usize, DomainError> {
        Ok(self.list(query).await?.len())
    }
}

// ============================================================================
// MetricsStore
// ============================================================================

/// Store for per-variant running counters.
///
/// Implementations must guarantee that concurrent `record` calls for the same
/// variant never lose an increment, and that counters only move forward
/// outside an explicit `reset`.
#[async_trait]
pub trait MetricsStore: Send + Sync + Debug {
    /// Register the variants of an experiment so events can be attributed
    async fn register(&self, experiment_id: &str, variant_ids: &[String])
        -> Result<(), DomainError>;

    /// Atomically apply one event to a variant's counters and return the
    /// updated metrics
    async fn record(
        &self,
        experiment_id: &str,
        variant_id: &str,
        event: MetricEvent,
        amount_micros: u64,
    ) -> Result<VariantMetrics, DomainError>;

    /// Read a consistent snapshot of all variant counters for an experiment,
    /// keyed by variant ID
    async fn snapshot(
        &self,
        experiment_id: &str,
    ) -> Result<BTreeMap<String, VariantMetrics>, DomainError>;

    /// Zero a variant's counters. The explicit correction path; counters are
    /// never decremented otherwise.
    async fn reset(&self, experiment_id: &str, variant_id: &str) -> Result<(), DomainError>;

    /// Drop all counters for an experiment
    async fn remove(&self, experiment_id: &str) -> Result<(), DomainError>;
}
