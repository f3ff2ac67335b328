//! Experiment service
//!
//! Orchestrates validation, planning, allocation, metrics ingestion, and
//! lifecycle transitions over the repository and metrics store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::experiment::{
    validate_config, Experiment, ExperimentConfig, ExperimentId, ExperimentQuery,
    ExperimentRepository, LifecycleAction, MetricEvent, MetricsStore, RecommendedAction,
    SignificanceResult, StatisticalSettings, SuccessMetric, VariantAllocation, VariantId,
    VariantMetrics, VariantModifications, VariantSpec,
};
use crate::domain::DomainError;
use crate::infrastructure::experiment::{
    DecisionEngine, SignificanceEvaluator, StatisticalPlanner, StatisticsConfig,
    VariantAllocator,
};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Request to create a new experiment
#[derive(Debug, Clone)]
pub struct CreateExperimentRequest {
    pub campaign_id: String,
    pub name: String,
    pub hypothesis: String,
    pub variants: Vec<CreateVariantRequest>,
    pub duration_days: u32,
    pub success_metrics: Vec<SuccessMetric>,
    pub statistical_settings: StatisticalSettings,
}

/// Request to create a variant. When `id` is absent it is derived from the
/// name.
#[derive(Debug, Clone)]
pub struct CreateVariantRequest {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub traffic_split: f64,
    pub modifications: VariantModifications,
}

/// Full read-model for one experiment: the aggregate, a metrics snapshot,
/// the significance evaluation, and the recommended action
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOverview {
    pub experiment: Experiment,
    pub metrics: BTreeMap<String, VariantMetrics>,
    pub significance: SignificanceResult,
    pub recommendation: RecommendedAction,
}

// ============================================================================
// Experiment Service
// ============================================================================

/// Service for managing A/B experiments against marketing campaigns
#[derive(Debug)]
pub struct ExperimentService<R: ExperimentRepository, M: MetricsStore> {
    repository: Arc<R>,
    metrics: Arc<M>,
    planner: StatisticalPlanner,
    allocator: VariantAllocator,
    evaluator: SignificanceEvaluator,
    decision: DecisionEngine,
}

impl<R: ExperimentRepository, M: MetricsStore> ExperimentService<R, M> {
    /// Create a new experiment service with the given planning assumptions
    pub fn new(repository: Arc<R>, metrics: Arc<M>, statistics: StatisticsConfig) -> Self {
        Self {
            repository,
            metrics,
            planner: StatisticalPlanner::new(statistics),
            allocator: VariantAllocator::new(),
            evaluator: SignificanceEvaluator::new(),
            decision: DecisionEngine::new(),
        }
    }

    // ========================================================================
    // CRUD Operations
    // ========================================================================

    /// Validate a configuration, derive its plan and allocations, and persist
    /// a new draft experiment.
    ///
    /// Validation collects every violation before failing, so the caller sees
    /// the full list in one round trip.
    pub async fn create(
        &self,
        request: CreateExperimentRequest,
    ) -> Result<Experiment, DomainError> {
        let config = build_config(request)?;

        let validation = validate_config(&config);
        if !validation.is_valid() {
            return Err(DomainError::config_invalid(validation.into_errors()));
        }

        let id = new_experiment_id()?;
        let plan = self.planner.plan(&config);
        let allocations = self.allocator.allocate(&id, &config);

        let experiment = Experiment::new(id.clone(), config, plan, allocations);
        let created = self.repository.create(experiment).await?;

        let variant_ids: Vec<String> = created
            .config()
            .variants
            .iter()
            .map(|v| v.id().to_string())
            .collect();
        self.metrics.register(id.as_str(), &variant_ids).await?;

        info!(
            experiment_id = %id,
            campaign_id = %created.config().campaign_id,
            variants = variant_ids.len(),
            "Experiment created"
        );

        Ok(created)
    }

    /// Get an experiment by ID
    pub async fn get(&self, id: &str) -> Result<Option<Experiment>, DomainError> {
        let experiment_id = parse_id(id)?;
        self.repository.get(&experiment_id).await
    }

    /// List experiments with optional filters
    pub async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError> {
        self.repository.list(query).await
    }

    /// Delete an experiment and drop its counters
    pub async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        debug!(experiment_id = %id, "Deleting experiment");

        let experiment_id = parse_id(id)?;

        if let Some(experiment) = self.repository.get(&experiment_id).await? {
            if experiment.state().is_running() {
                return Err(DomainError::validation(
                    "Cannot delete a running experiment. Stop or complete it first.",
                ));
            }
        }

        self.metrics.remove(id).await?;
        let deleted = self.repository.delete(&experiment_id).await?;

        if deleted {
            info!(experiment_id = %id, "Experiment deleted");
        }

        Ok(deleted)
    }

    // ========================================================================
    // Lifecycle Operations
    // ========================================================================

    /// Apply a lifecycle action.
    ///
    /// Starting a draft re-validates its configuration, and completing a
    /// running experiment requires either an elapsed duration or a declared
    /// winner; both gates fail with a not-ready error rather than an illegal
    /// transition.
    pub async fn apply_action(
        &self,
        id: &str,
        action: LifecycleAction,
    ) -> Result<Experiment, DomainError> {
        debug!(experiment_id = %id, action = %action, "Applying lifecycle action");

        let experiment_id = parse_id(id)?;
        let mut experiment = self.load(&experiment_id).await?;

        if action == LifecycleAction::Start && experiment.state().is_editable() {
            let validation = validate_config(experiment.config());
            if !validation.is_valid() {
                return Err(DomainError::not_ready(format!(
                    "Experiment '{}' configuration is no longer valid: {}",
                    id,
                    validation.errors().join("; ")
                )));
            }
            if experiment.allocations().is_empty() {
                return Err(DomainError::not_ready(format!(
                    "Experiment '{}' has no variant allocations",
                    id
                )));
            }
        }

        if action == LifecycleAction::Complete && experiment.state().is_running() {
            let elapsed = experiment.duration_elapsed(Utc::now());
            let has_winner = self.evaluate(&experiment).await?.is_significant;
            if !elapsed && !has_winner {
                return Err(DomainError::not_ready(format!(
                    "Experiment '{}' has neither elapsed its duration nor declared a winner",
                    id
                )));
            }
        }

        experiment
            .apply(action)
            .map_err(|(state, action)| {
                DomainError::invalid_transition(state.to_string(), action.to_string())
            })?;

        let updated = self.repository.update(experiment).await?;
        info!(experiment_id = %id, action = %action, state = %updated.state(), "Lifecycle action applied");

        Ok(updated)
    }

    // ========================================================================
    // Metrics Ingestion
    // ========================================================================

    /// Record one performance event against a variant.
    ///
    /// Events are only accepted while the experiment is running; anything
    /// else is rejected so paused and finished experiments keep frozen
    /// counters.
    pub async fn record_event(
        &self,
        id: &str,
        variant_id: &str,
        event: MetricEvent,
        amount_micros: u64,
    ) -> Result<VariantMetrics, DomainError> {
        let experiment_id = parse_id(id)?;
        let experiment = self.load(&experiment_id).await?;

        if !experiment.state().is_running() {
            return Err(DomainError::not_ready(format!(
                "Experiment '{}' is not accepting events in state '{}'",
                id,
                experiment.state()
            )));
        }

        if experiment.config().variant(variant_id).is_none() {
            return Err(DomainError::not_found(format!(
                "Unknown variant '{}' for experiment '{}'",
                variant_id, id
            )));
        }

        let metrics = self
            .metrics
            .record(id, variant_id, event, amount_micros)
            .await?;

        debug!(
            experiment_id = %id,
            variant_id = %variant_id,
            event = %event,
            "Recorded metric event"
        );

        Ok(metrics)
    }

    /// Zero one variant's counters. The explicit correction path for bad
    /// ingestion.
    pub async fn reset_metrics(&self, id: &str, variant_id: &str) -> Result<(), DomainError> {
        let experiment_id = parse_id(id)?;
        let experiment = self.load(&experiment_id).await?;

        if experiment.config().variant(variant_id).is_none() {
            return Err(DomainError::not_found(format!(
                "Unknown variant '{}' for experiment '{}'",
                variant_id, id
            )));
        }

        self.metrics.reset(id, variant_id).await?;
        info!(experiment_id = %id, variant_id = %variant_id, "Variant metrics reset");

        Ok(())
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Full read-model: aggregate, metrics snapshot, significance, and the
    /// recommended action.
    ///
    /// A running experiment whose duration has elapsed is completed here
    /// before the overview is returned, so readers never see an expired
    /// experiment still reported as running.
    pub async fn overview(&self, id: &str) -> Result<ExperimentOverview, DomainError> {
        let experiment_id = parse_id(id)?;
        let mut experiment = self.load(&experiment_id).await?;

        if experiment.state().is_running() && experiment.duration_elapsed(Utc::now()) {
            experiment
                .apply(LifecycleAction::Complete)
                .map_err(|(state, action)| {
                    DomainError::invalid_transition(state.to_string(), action.to_string())
                })?;
            experiment = self.repository.update(experiment).await?;
            info!(experiment_id = %id, "Experiment auto-completed after elapsed duration");
        }

        let metrics = self.metrics.snapshot(id).await?;
        let significance =
            self.evaluator
                .evaluate(experiment.config(), experiment.plan(), &metrics)?;
        let recommendation = self.decision.decide(&significance);

        Ok(ExperimentOverview {
            experiment,
            metrics,
            significance,
            recommendation,
        })
    }

    /// Traffic allocations and tracking contracts for an experiment
    pub async fn allocations(&self, id: &str) -> Result<Vec<VariantAllocation>, DomainError> {
        let experiment_id = parse_id(id)?;
        let experiment = self.load(&experiment_id).await?;
        Ok(experiment.allocations().to_vec())
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    async fn load(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", id)))
    }

    /// Evaluate significance over a snapshot taken now
    async fn evaluate(&self, experiment: &Experiment) -> Result<SignificanceResult, DomainError> {
        let snapshot = self.metrics.snapshot(experiment.id().as_str()).await?;
        self.evaluator
            .evaluate(experiment.config(), experiment.plan(), &snapshot)
    }
}

fn parse_id(id: &str) -> Result<ExperimentId, DomainError> {
    ExperimentId::new(id).map_err(|e| DomainError::invalid_id(e.to_string()))
}

fn new_experiment_id() -> Result<ExperimentId, DomainError> {
    ExperimentId::new(format!("exp-{}", Uuid::new_v4()))
        .map_err(|e| DomainError::internal(format!("Generated invalid experiment ID: {}", e)))
}

fn build_config(request: CreateExperimentRequest) -> Result<ExperimentConfig, DomainError> {
    let mut variants = Vec::with_capacity(request.variants.len());

    for variant_req in request.variants {
        let variant_id = match variant_req.id {
            Some(id) => VariantId::new(id),
            None => VariantId::from_name(&variant_req.name),
        }
        .map_err(|e| {
            DomainError::config_invalid(vec![format!(
                "Invalid variant '{}': {}",
                variant_req.name, e
            )])
        })?;

        let mut variant = VariantSpec::new(variant_id, variant_req.name, variant_req.traffic_split)
            .with_modifications(variant_req.modifications);

        if let Some(description) = variant_req.description {
            variant = variant.with_description(description);
        }

        variants.push(variant);
    }

    Ok(ExperimentConfig {
        campaign_id: request.campaign_id,
        name: request.name,
        hypothesis: request.hypothesis,
        variants,
        duration_days: request.duration_days,
        success_metrics: request.success_metrics,
        statistical_settings: request.statistical_settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ExperimentState, SignificanceReason};
    use crate::infrastructure::experiment::{
        InMemoryExperimentRepository, InMemoryMetricsStore,
    };

    fn create_service() -> ExperimentService<InMemoryExperimentRepository, InMemoryMetricsStore> {
        // Baseline of 50% keeps the formula sample small enough that the
        // configured floor of 100 is the binding requirement
        let statistics = StatisticsConfig {
            baseline_conversion_rate: 0.5,
            assumed_daily_traffic: 1000,
            power: 0.8,
        };
        ExperimentService::new(
            Arc::new(InMemoryExperimentRepository::new()),
            Arc::new(InMemoryMetricsStore::new()),
            statistics,
        )
    }

    fn variant(name: &str, split: f64) -> CreateVariantRequest {
        CreateVariantRequest {
            id: None,
            name: name.to_string(),
            description: None,
            traffic_split: split,
            modifications: VariantModifications::default(),
        }
    }

    fn valid_request() -> CreateExperimentRequest {
        CreateExperimentRequest {
            campaign_id: "camp-1".to_string(),
            name: "Creative A vs Creative B".to_string(),
            hypothesis: "New creative improves conversion".to_string(),
            variants: vec![variant("Control", 50.0), variant("New Creative", 50.0)],
            duration_days: 14,
            success_metrics: vec![SuccessMetric {
                metric: "conversions".to_string(),
                target: 100.0,
                weight: 1.0,
            }],
            statistical_settings: StatisticalSettings {
                confidence_level: 95.0,
                minimum_sample_size: 100,
                minimum_detectable_effect: 50.0,
            },
        }
    }

    async fn running_experiment(
        service: &ExperimentService<InMemoryExperimentRepository, InMemoryMetricsStore>,
    ) -> String {
        let created = service.create(valid_request()).await.unwrap();
        let id = created.id().to_string();
        service
            .apply_action(&id, LifecycleAction::Start)
            .await
            .unwrap();
        id
    }

    /// Record `impressions` impressions and `conversions` conversions
    async fn feed(
        service: &ExperimentService<InMemoryExperimentRepository, InMemoryMetricsStore>,
        id: &str,
        variant_id: &str,
        impressions: u64,
        conversions: u64,
    ) {
        for _ in 0..impressions {
            service
                .record_event(id, variant_id, MetricEvent::Impression, 0)
                .await
                .unwrap();
        }
        for _ in 0..conversions {
            service
                .record_event(id, variant_id, MetricEvent::Conversion, 0)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_experiment() {
        let service = create_service();
        let created = service.create(valid_request()).await.unwrap();

        assert!(created.id().as_str().starts_with("exp-"));
        assert_eq!(created.state(), ExperimentState::Draft);
        assert_eq!(created.config().variants.len(), 2);
        assert_eq!(created.config().variants[1].id().as_str(), "new-creative");
        assert_eq!(created.allocations().len(), 2);
        // Formula gives a small sample at a 50% baseline; the floor wins
        assert_eq!(created.plan().required_sample_per_variant, 100);
    }

    #[tokio::test]
    async fn test_create_collects_all_validation_errors() {
        let service = create_service();
        let request = CreateExperimentRequest {
            campaign_id: String::new(),
            name: "ab".to_string(),
            variants: vec![variant("Only One", 60.0)],
            duration_days: 0,
            success_metrics: Vec::new(),
            statistical_settings: StatisticalSettings {
                confidence_level: 50.0,
                minimum_sample_size: 100,
                minimum_detectable_effect: 10.0,
            },
            ..valid_request()
        };

        let err = service.create(request).await.unwrap_err();
        match err {
            DomainError::ConfigInvalid { errors } => {
                assert!(errors.len() >= 5, "expected all violations, got {:?}", errors);
                assert!(errors
                    .iter()
                    .any(|e| e.contains("at least 3 characters")));
                assert!(errors.iter().any(|e| e.contains("At least 2 variants")));
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_zero_mde() {
        let service = create_service();
        let mut request = valid_request();
        request.statistical_settings.minimum_detectable_effect = 0.0;

        let err = service.create(request).await.unwrap_err();
        match err {
            DomainError::ConfigInvalid { errors } => {
                assert!(errors.iter().any(|e| e.contains("detectable effect")));
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_and_record_events() {
        let service = create_service();
        let id = running_experiment(&service).await;

        let metrics = service
            .record_event(&id, "control", MetricEvent::Impression, 0)
            .await
            .unwrap();
        assert_eq!(metrics.impressions, 1);

        let metrics = service
            .record_event(&id, "control", MetricEvent::Cost, 1_500_000)
            .await
            .unwrap();
        assert_eq!(metrics.cost_micros, 1_500_000);
    }

    #[tokio::test]
    async fn test_events_rejected_when_not_running() {
        let service = create_service();
        let created = service.create(valid_request()).await.unwrap();
        let id = created.id().to_string();

        // Draft
        let err = service
            .record_event(&id, "control", MetricEvent::Impression, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotReady { .. }));

        // Paused
        service.apply_action(&id, LifecycleAction::Start).await.unwrap();
        service.apply_action(&id, LifecycleAction::Pause).await.unwrap();
        let err = service
            .record_event(&id, "control", MetricEvent::Impression, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_event_for_unknown_variant_rejected() {
        let service = create_service();
        let id = running_experiment(&service).await;

        let err = service
            .record_event(&id, "no-such-variant", MetricEvent::Impression, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_illegal_transition_reported() {
        let service = create_service();
        let created = service.create(valid_request()).await.unwrap();
        let id = created.id().to_string();

        let err = service
            .apply_action(&id, LifecycleAction::Pause)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot pause from draft"
        );
    }

    #[tokio::test]
    async fn test_complete_not_ready_without_winner_or_elapsed_duration() {
        let service = create_service();
        let id = running_experiment(&service).await;

        let err = service
            .apply_action(&id, LifecycleAction::Complete)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_complete_allowed_with_declared_winner() {
        let service = create_service();
        let id = running_experiment(&service).await;

        // 20% vs 40% conversion over 200 impressions each clears a 95% bar
        feed(&service, &id, "control", 200, 40).await;
        feed(&service, &id, "new-creative", 200, 80).await;

        let completed = service
            .apply_action(&id, LifecycleAction::Complete)
            .await
            .unwrap();
        assert_eq!(completed.state(), ExperimentState::Completed);
        assert!(completed.completed_at().is_some());
    }

    #[tokio::test]
    async fn test_overview_declares_winner() {
        let service = create_service();
        let id = running_experiment(&service).await;

        feed(&service, &id, "control", 200, 40).await;
        feed(&service, &id, "new-creative", 200, 80).await;

        let overview = service.overview(&id).await.unwrap();
        assert!(overview.significance.is_significant);
        assert_eq!(
            overview.significance.winning_variant.as_deref(),
            Some("new-creative")
        );
        assert!((overview.significance.lift_percentage - 100.0).abs() < 1e-9);
        assert_eq!(overview.recommendation, RecommendedAction::DeclareWinner);
    }

    #[tokio::test]
    async fn test_overview_continues_while_sample_short() {
        let service = create_service();
        let id = running_experiment(&service).await;

        feed(&service, &id, "control", 50, 10).await;
        feed(&service, &id, "new-creative", 50, 20).await;

        let overview = service.overview(&id).await.unwrap();
        assert!(!overview.significance.is_significant);
        assert_eq!(
            overview.significance.reason,
            Some(SignificanceReason::SampleTargetNotReached)
        );
        assert_eq!(overview.recommendation, RecommendedAction::ContinueTest);
    }

    #[tokio::test]
    async fn test_overview_insufficient_data_before_any_events() {
        let service = create_service();
        let id = running_experiment(&service).await;

        let overview = service.overview(&id).await.unwrap();
        assert_eq!(
            overview.significance.reason,
            Some(SignificanceReason::InsufficientData)
        );
        assert_eq!(overview.recommendation, RecommendedAction::ContinueTest);
    }

    #[tokio::test]
    async fn test_overview_stops_inconclusive_at_full_sample() {
        let service = create_service();
        let id = running_experiment(&service).await;

        // Identical conversion rates at full sample
        feed(&service, &id, "control", 200, 40).await;
        feed(&service, &id, "new-creative", 200, 41).await;

        let overview = service.overview(&id).await.unwrap();
        assert!(!overview.significance.is_significant);
        assert_eq!(
            overview.significance.reason,
            Some(SignificanceReason::BelowConfidenceBar)
        );
        assert_eq!(overview.recommendation, RecommendedAction::StopInconclusive);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let service = create_service();
        let id = running_experiment(&service).await;

        feed(&service, &id, "control", 10, 2).await;
        service.reset_metrics(&id, "control").await.unwrap();

        let overview = service.overview(&id).await.unwrap();
        assert_eq!(overview.metrics["control"].impressions, 0);
    }

    #[tokio::test]
    async fn test_allocations_expose_tracking_contract() {
        let service = create_service();
        let created = service.create(valid_request()).await.unwrap();

        let allocations = service.allocations(created.id().as_str()).await.unwrap();
        assert_eq!(allocations.len(), 2);

        let tags = &allocations[1].tracking().tags;
        assert_eq!(tags.utm_source, "pulsebridge");
        assert_eq!(tags.utm_medium, "abtest");
        assert_eq!(tags.utm_campaign, "camp-1");
        assert_eq!(tags.utm_content, "new_creative");
        assert_eq!(
            allocations[0].tracking().conversion_events,
            vec!["conversions".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_running_experiment_fails() {
        let service = create_service();
        let id = running_experiment(&service).await;

        let err = service.delete(&id).await.unwrap_err();
        assert!(err.to_string().contains("running"));

        service.apply_action(&id, LifecycleAction::Stop).await.unwrap();
        assert!(service.delete(&id).await.unwrap());
        assert!(service.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_archive() {
        let service = create_service();
        let id = running_experiment(&service).await;

        service.apply_action(&id, LifecycleAction::Stop).await.unwrap();
        let archived = service
            .apply_action(&id, LifecycleAction::Archive)
            .await
            .unwrap();
        assert_eq!(archived.state(), ExperimentState::Archived);
    }

    #[tokio::test]
    async fn test_list_by_campaign() {
        let service = create_service();
        service.create(valid_request()).await.unwrap();

        let mut other = valid_request();
        other.campaign_id = "camp-2".to_string();
        service.create(other).await.unwrap();

        let results = service
            .list(&ExperimentQuery::new().with_campaign("camp-1"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}
