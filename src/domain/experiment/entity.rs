//! Experiment domain entities

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::allocation::VariantAllocation;
use super::plan::StatisticalPlan;
use super::validation::{
    validate_experiment_id, validate_variant_id, ExperimentValidationError,
};

// ============================================================================
// ExperimentId
// ============================================================================

/// Unique identifier for an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create a new experiment ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_experiment_id(&id)?;
        Ok(Self(id))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentId> for String {
    fn from(id: ExperimentId) -> Self {
        id.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// VariantId
// ============================================================================

/// Unique identifier for a variant within an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariantId(String);

impl VariantId {
    /// Create a new variant ID with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_variant_id(&id)?;
        Ok(Self(id))
    }

    /// Derive a variant ID from a display name (lowercased, whitespace
    /// collapsed to hyphens)
    pub fn from_name(name: &str) -> Result<Self, ExperimentValidationError> {
        let slug: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .collect();
        Self::new(slug)
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VariantId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VariantId> for String {
    fn from(id: VariantId) -> Self {
        id.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VariantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// ExperimentState / LifecycleAction
// ============================================================================

/// Lifecycle state of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentState {
    /// Experiment is being configured, not yet serving traffic
    #[default]
    Draft,
    /// Experiment is actively serving traffic and collecting metrics
    Running,
    /// Experiment is temporarily paused
    Paused,
    /// Experiment was stopped by an operator before completion
    Stopped,
    /// Experiment finished (duration elapsed or winner declared)
    Completed,
    /// Experiment is archived and read-only
    Archived,
}

/// Operator or scheduler action against the experiment lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Pause,
    Stop,
    Complete,
    Archive,
}

impl ExperimentState {
    /// Check if the experiment is currently collecting metrics
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if the experiment can accept configuration changes
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Resolve the target state for an action, or `None` if the action is
    /// not legal from this state
    pub fn transition(&self, action: LifecycleAction) -> Option<ExperimentState> {
        match (self, action) {
            (Self::Draft, LifecycleAction::Start) => Some(Self::Running),
            (Self::Running, LifecycleAction::Pause) => Some(Self::Paused),
            (Self::Paused, LifecycleAction::Start) => Some(Self::Running),
            (Self::Running, LifecycleAction::Stop) => Some(Self::Stopped),
            (Self::Running, LifecycleAction::Complete) => Some(Self::Completed),
            (Self::Stopped, LifecycleAction::Archive) => Some(Self::Archived),
            (Self::Completed, LifecycleAction::Archive) => Some(Self::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Completed => write!(f, "completed"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Stop => write!(f, "stop"),
            Self::Complete => write!(f, "complete"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

// ============================================================================
// SuccessMetric / StatisticalSettings
// ============================================================================

/// A success metric target declared on the experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetric {
    pub metric: String,
    pub target: f64,
    pub weight: f64,
}

/// Statistical settings chosen by the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSettings {
    /// Confidence level as a percentage, e.g. 95
    pub confidence_level: f64,
    /// Floor on the per-variant sample size regardless of the formula output
    pub minimum_sample_size: u64,
    /// Minimum detectable effect as a percentage, e.g. 10
    pub minimum_detectable_effect: f64,
}

// ============================================================================
// VariantSpec
// ============================================================================

/// Modification overrides for a variant. Opaque to the engine; passed through
/// to the delivery layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantModifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeting: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidding: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<serde_json::Value>,
}

/// One arm of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSpec {
    id: VariantId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    traffic_split: f64,
    #[serde(default)]
    modifications: VariantModifications,
}

impl VariantSpec {
    /// Create a new variant with a traffic split percentage
    pub fn new(id: VariantId, name: impl Into<String>, traffic_split: f64) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            traffic_split,
            modifications: VariantModifications::default(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the modification overrides
    pub fn with_modifications(mut self, modifications: VariantModifications) -> Self {
        self.modifications = modifications;
        self
    }

    pub fn id(&self) -> &VariantId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn traffic_split(&self) -> f64 {
        self.traffic_split
    }

    pub fn modifications(&self) -> &VariantModifications {
        &self.modifications
    }
}

// ============================================================================
// ExperimentConfig
// ============================================================================

/// Operator-submitted experiment configuration. Immutable once the experiment
/// leaves the draft state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub campaign_id: String,
    pub name: String,
    pub hypothesis: String,
    pub variants: Vec<VariantSpec>,
    pub duration_days: u32,
    pub success_metrics: Vec<SuccessMetric>,
    pub statistical_settings: StatisticalSettings,
}

impl ExperimentConfig {
    /// The designated control variant is the first in the ordered list
    pub fn control_variant(&self) -> Option<&VariantSpec> {
        self.variants.first()
    }

    /// Find a variant by ID
    pub fn variant(&self, id: &str) -> Option<&VariantSpec> {
        self.variants.iter().find(|v| v.id().as_str() == id)
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// The experiment aggregate: config, derived plan and allocations, lifecycle
/// state, and a version counter for optimistic concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    id: ExperimentId,
    config: ExperimentConfig,
    state: ExperimentState,
    plan: StatisticalPlan,
    allocations: Vec<VariantAllocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
    estimated_end_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Experiment {
    /// Create a new experiment in draft state from a validated config and its
    /// derived plan and allocations
    pub fn new(
        id: ExperimentId,
        config: ExperimentConfig,
        plan: StatisticalPlan,
        allocations: Vec<VariantAllocation>,
    ) -> Self {
        let now = Utc::now();
        let estimated_end_date = now + Duration::days(i64::from(config.duration_days));
        Self {
            id,
            config,
            state: ExperimentState::Draft,
            plan,
            allocations,
            started_at: None,
            completed_at: None,
            estimated_end_date,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    // Getters

    pub fn id(&self) -> &ExperimentId {
        &self.id
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn state(&self) -> ExperimentState {
        self.state
    }

    pub fn plan(&self) -> &StatisticalPlan {
        &self.plan
    }

    pub fn allocations(&self) -> &[VariantAllocation] {
        &self.allocations
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn estimated_end_date(&self) -> DateTime<Utc> {
        self.estimated_end_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The control variant ID (first variant in the ordered list)
    pub fn control_variant_id(&self) -> Option<&VariantId> {
        self.config.control_variant().map(|v| v.id())
    }

    /// Check if the configured duration has elapsed since the start
    pub fn duration_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.started_at {
            Some(started) => now - started >= Duration::days(i64::from(self.config.duration_days)),
            None => false,
        }
    }

    // State transitions

    /// Apply a lifecycle action, moving to the target state or failing with
    /// the action and current state if the transition is not legal
    pub fn apply(&mut self, action: LifecycleAction) -> Result<(), (ExperimentState, LifecycleAction)> {
        let next = self
            .state
            .transition(action)
            .ok_or((self.state, action))?;

        let now = Utc::now();

        if self.state == ExperimentState::Draft && next == ExperimentState::Running {
            self.started_at = Some(now);
        }

        if next == ExperimentState::Completed {
            self.completed_at = Some(now);
        }

        self.state = next;
        self.updated_at = now;
        Ok(())
    }

    /// Bump the version counter. Called by repositories when persisting an
    /// update; the previous version is what optimistic checks compare against.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }
}
