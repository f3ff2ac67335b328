//! Experiment management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::experiment::{
    Experiment, ExperimentQuery, ExperimentState, LifecycleAction, MetricEvent,
    RecommendedAction, SignificanceResult, StatisticalPlan, SuccessMetric, VariantAllocation,
    VariantMetrics, VariantModifications,
};
use crate::infrastructure::services::{
    CreateExperimentRequest, CreateVariantRequest, ExperimentOverview,
};

// ============================================================================
// Request Types
// ============================================================================

/// Request to create a new experiment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateExperimentApiRequest {
    pub campaign_id: String,
    pub name: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub variants: Vec<CreateVariantApiRequest>,
    pub duration_days: u32,
    #[serde(default)]
    pub success_metrics: Vec<SuccessMetricRequest>,
    pub statistical_settings: StatisticalSettingsRequest,
}

/// Request to create a variant
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVariantApiRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub traffic_split: f64,
    #[serde(default)]
    pub modifications: VariantModifications,
}

/// Success metric declaration
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessMetricRequest {
    pub metric: String,
    pub target: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Statistical settings
#[derive(Debug, Clone, Deserialize)]
pub struct StatisticalSettingsRequest {
    pub confidence_level: f64,
    pub minimum_sample_size: u64,
    pub minimum_detectable_effect: f64,
}

/// Lifecycle action request
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub action: LifecycleAction,
}

/// Metric event request
#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventRequest {
    pub variant_id: String,
    pub event: MetricEvent,
    /// Spend in micro-dollars; only meaningful for cost events
    #[serde(default)]
    pub amount_micros: u64,
}

/// Query parameters for listing experiments
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListExperimentsQuery {
    pub state: Option<String>,
    pub campaign_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Experiment response
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResponse {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub hypothesis: String,
    pub state: String,
    pub variants: Vec<VariantResponse>,
    pub duration_days: u32,
    pub success_metrics: Vec<SuccessMetric>,
    pub plan: StatisticalPlan,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub estimated_end_date: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: u64,
}

/// Variant response
#[derive(Debug, Clone, Serialize)]
pub struct VariantResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub traffic_split: f64,
    pub modifications: VariantModifications,
}

/// List experiments response
#[derive(Debug, Clone, Serialize)]
pub struct ListExperimentsResponse {
    pub experiments: Vec<ExperimentResponse>,
    pub total: usize,
}

/// Experiment overview response: the aggregate plus the latest metrics,
/// significance evaluation, and recommended action
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOverviewResponse {
    pub experiment: ExperimentResponse,
    pub metrics: Vec<VariantMetricsResponse>,
    pub significance: SignificanceResult,
    pub recommendation: RecommendedAction,
}

/// Per-variant metrics with derived rates
#[derive(Debug, Clone, Serialize)]
pub struct VariantMetricsResponse {
    pub variant_id: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub cost_micros: u64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub cpc: f64,
    pub cpa: f64,
}

/// Allocations response
#[derive(Debug, Clone, Serialize)]
pub struct AllocationsResponse {
    pub experiment_id: String,
    pub allocations: Vec<VariantAllocation>,
}

// ============================================================================
// Conversion Implementations
// ============================================================================

fn parse_state(s: &str) -> Result<ExperimentState, ApiError> {
    match s.to_lowercase().as_str() {
        "draft" => Ok(ExperimentState::Draft),
        "running" => Ok(ExperimentState::Running),
        "paused" => Ok(ExperimentState::Paused),
        "stopped" => Ok(ExperimentState::Stopped),
        "completed" => Ok(ExperimentState::Completed),
        "archived" => Ok(ExperimentState::Archived),
        other => Err(ApiError::bad_request(format!(
            "Invalid state '{}'. Valid values: draft, running, paused, stopped, completed, archived",
            other
        ))),
    }
}

impl From<&Experiment> for ExperimentResponse {
    fn from(experiment: &Experiment) -> Self {
        let config = experiment.config();
        Self {
            id: experiment.id().as_str().to_string(),
            campaign_id: config.campaign_id.clone(),
            name: config.name.clone(),
            hypothesis: config.hypothesis.clone(),
            state: experiment.state().to_string(),
            variants: config
                .variants
                .iter()
                .map(|v| VariantResponse {
                    id: v.id().as_str().to_string(),
                    name: v.name().to_string(),
                    description: v.description().map(|s| s.to_string()),
                    traffic_split: v.traffic_split(),
                    modifications: v.modifications().clone(),
                })
                .collect(),
            duration_days: config.duration_days,
            success_metrics: config.success_metrics.clone(),
            plan: experiment.plan().clone(),
            started_at: experiment.started_at().map(|t| t.to_rfc3339()),
            completed_at: experiment.completed_at().map(|t| t.to_rfc3339()),
            estimated_end_date: experiment.estimated_end_date().to_rfc3339(),
            created_at: experiment.created_at().to_rfc3339(),
            updated_at: experiment.updated_at().to_rfc3339(),
            version: experiment.version(),
        }
    }
}

fn metrics_response(variant_id: &str, metrics: &VariantMetrics) -> VariantMetricsResponse {
    VariantMetricsResponse {
        variant_id: variant_id.to_string(),
        impressions: metrics.impressions,
        clicks: metrics.clicks,
        conversions: metrics.conversions,
        cost_micros: metrics.cost_micros,
        ctr: metrics.ctr(),
        conversion_rate: metrics.conversion_rate(),
        cpc: metrics.cpc(),
        cpa: metrics.cpa(),
    }
}

impl From<&ExperimentOverview> for ExperimentOverviewResponse {
    fn from(overview: &ExperimentOverview) -> Self {
        Self {
            experiment: ExperimentResponse::from(&overview.experiment),
            metrics: overview
                .metrics
                .iter()
                .map(|(variant_id, m)| metrics_response(variant_id, m))
                .collect(),
            significance: overview.significance.clone(),
            recommendation: overview.recommendation,
        }
    }
}

fn build_create_request(request: CreateExperimentApiRequest) -> CreateExperimentRequest {
    CreateExperimentRequest {
        campaign_id: request.campaign_id,
        name: request.name,
        hypothesis: request.hypothesis,
        variants: request
            .variants
            .into_iter()
            .map(|v| CreateVariantRequest {
                id: v.id,
                name: v.name,
                description: v.description,
                traffic_split: v.traffic_split,
                modifications: v.modifications,
            })
            .collect(),
        duration_days: request.duration_days,
        success_metrics: request
            .success_metrics
            .into_iter()
            .map(|m| SuccessMetric {
                metric: m.metric,
                target: m.target,
                weight: m.weight,
            })
            .collect(),
        statistical_settings: crate::domain::experiment::StatisticalSettings {
            confidence_level: request.statistical_settings.confidence_level,
            minimum_sample_size: request.statistical_settings.minimum_sample_size,
            minimum_detectable_effect: request.statistical_settings.minimum_detectable_effect,
        },
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/experiments
pub async fn create_experiment(
    State(state): State<AppState>,
    Json(request): Json<CreateExperimentApiRequest>,
) -> Result<(StatusCode, Json<ExperimentResponse>), ApiError> {
    debug!(campaign_id = %request.campaign_id, "Creating experiment");

    let experiment = state
        .experiment_service
        .create(build_create_request(request))
        .await?;

    Ok((StatusCode::CREATED, Json(ExperimentResponse::from(&experiment))))
}

/// GET /v1/experiments
pub async fn list_experiments(
    State(state): State<AppState>,
    Query(params): Query<ListExperimentsQuery>,
) -> Result<Json<ListExperimentsResponse>, ApiError> {
    debug!("Listing experiments");

    let mut query = ExperimentQuery::new();

    if let Some(ref state_str) = params.state {
        query = query.with_state(parse_state(state_str)?);
    }

    if let Some(ref campaign_id) = params.campaign_id {
        query = query.with_campaign(campaign_id);
    }

    if let Some(limit) = params.limit {
        query = query.with_limit(limit);
    }

    if let Some(offset) = params.offset {
        query = query.with_offset(offset);
    }

    let experiments = state.experiment_service.list(&query).await?;

    let responses: Vec<ExperimentResponse> =
        experiments.iter().map(ExperimentResponse::from).collect();
    let total = responses.len();

    Ok(Json(ListExperimentsResponse {
        experiments: responses,
        total,
    }))
}

/// GET /v1/experiments/{id}
pub async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExperimentOverviewResponse>, ApiError> {
    debug!(experiment_id = %id, "Getting experiment overview");

    let overview = state.experiment_service.overview(&id).await?;
    Ok(Json(ExperimentOverviewResponse::from(&overview)))
}

/// DELETE /v1/experiments/{id}
pub async fn delete_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(experiment_id = %id, "Deleting experiment");

    let deleted = state.experiment_service.delete(&id).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!(
            "Experiment '{}' not found",
            id
        )))
    }
}

/// POST /v1/experiments/{id}/actions
pub async fn apply_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ExperimentResponse>, ApiError> {
    debug!(experiment_id = %id, action = %request.action, "Applying lifecycle action");

    let experiment = state
        .experiment_service
        .apply_action(&id, request.action)
        .await?;

    Ok(Json(ExperimentResponse::from(&experiment)))
}

/// POST /v1/experiments/{id}/events
pub async fn record_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordEventRequest>,
) -> Result<Json<VariantMetricsResponse>, ApiError> {
    let metrics = state
        .experiment_service
        .record_event(&id, &request.variant_id, request.event, request.amount_micros)
        .await?;

    Ok(Json(metrics_response(&request.variant_id, &metrics)))
}

/// GET /v1/experiments/{id}/allocations
pub async fn get_allocations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AllocationsResponse>, ApiError> {
    let allocations = state.experiment_service.allocations(&id).await?;

    Ok(Json(AllocationsResponse {
        experiment_id: id,
        allocations,
    }))
}

/// POST /v1/experiments/{id}/variants/{variant_id}/reset
pub async fn reset_variant_metrics(
    State(state): State<AppState>,
    Path((id, variant_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    debug!(experiment_id = %id, variant_id = %variant_id, "Resetting variant metrics");

    state
        .experiment_service
        .reset_metrics(&id, &variant_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
