//! In-memory experiment repository

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::experiment::{
    Experiment, ExperimentId, ExperimentQuery, ExperimentRepository,
};
use crate::domain::DomainError;

/// In-memory implementation of [`ExperimentRepository`].
///
/// Writes take the lock for the whole read-compare-write of the optimistic
/// version check, so two updates from the same loaded version cannot both
/// land.
#[derive(Debug, Default)]
pub struct InMemoryExperimentRepository {
    experiments: RwLock<HashMap<String, Experiment>>,
}

impl InMemoryExperimentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExperimentRepository for InMemoryExperimentRepository {
    async fn create(&self, experiment: Experiment) -> Result<Experiment, DomainError> {
        let mut experiments = self.experiments.write().await;
        let id = experiment.id().as_str().to_string();

        if experiments.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "Experiment '{}' already exists",
                id
            )));
        }

        debug!(experiment_id = %id, "Creating experiment");
        experiments.insert(id, experiment.clone());
        Ok(experiment)
    }

    async fn get(&self, id: &ExperimentId) -> Result<Option<Experiment>, DomainError> {
        let experiments = self.experiments.read().await;
        Ok(experiments.get(id.as_str()).cloned())
    }

    async fn update(&self, mut experiment: Experiment) -> Result<Experiment, DomainError> {
        let mut experiments = self.experiments.write().await;
        let id = experiment.id().as_str().to_string();

        let stored = experiments
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", id)))?;

        if stored.version() != experiment.version() {
            return Err(DomainError::conflict(format!(
                "Experiment '{}' was modified concurrently (stored version {}, update based on {})",
                id,
                stored.version(),
                experiment.version()
            )));
        }

        experiment.bump_version();
        debug!(experiment_id = %id, version = experiment.version(), "Updating experiment");
        experiments.insert(id, experiment.clone());
        Ok(experiment)
    }

    async fn delete(&self, id: &ExperimentId) -> Result<bool, DomainError> {
        let mut experiments = self.experiments.write().await;
        Ok(experiments.remove(id.as_str()).is_some())
    }

    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError> {
        let experiments = self.experiments.read().await;

        let mut results: Vec<Experiment> = experiments
            .values()
            .filter(|e| query.state.is_none_or(|s| e.state() == s))
            .filter(|e| {
                query
                    .campaign_id
                    .as_deref()
                    .is_none_or(|c| e.config().campaign_id == c)
            })
            .cloned()
            .collect();

        // Newest first; key order gives a stable tie-break
        results.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });

        let offset = query.offset.unwrap_or(0);
        let results: Vec<Experiment> = match query.limit {
            Some(limit) => results.into_iter().skip(offset).take(limit).collect(),
            None => results.into_iter().skip(offset).collect(),
        };

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{
        ExperimentConfig, ExperimentState, LifecycleAction, StatisticalPlan,
        StatisticalSettings, SuccessMetric, VariantAllocation, VariantId, VariantSpec,
    };

    fn test_experiment(id: &str, campaign_id: &str) -> Experiment {
        let config = ExperimentConfig {
            campaign_id: campaign_id.to_string(),
            name: format!("Experiment {}", id),
            hypothesis: "Variant beats control".to_string(),
            variants: vec![
                VariantSpec::new(VariantId::new("control").unwrap(), "Control", 50.0),
                VariantSpec::new(VariantId::new("variant-a").unwrap(), "Variant A", 50.0),
            ],
            duration_days: 14,
            success_metrics: vec![SuccessMetric {
                metric: "conversions".to_string(),
                target: 100.0,
                weight: 1.0,
            }],
            statistical_settings: StatisticalSettings {
                confidence_level: 95.0,
                minimum_sample_size: 100,
                minimum_detectable_effect: 10.0,
            },
        };
        let plan = StatisticalPlan {
            required_sample_per_variant: 1000,
            total_required_sample: 2000,
            estimated_duration_days: 1,
            confidence_level: 95.0,
            minimum_detectable_effect: 10.0,
            power: 0.8,
        };
        Experiment::new(
            ExperimentId::new(id).unwrap(),
            config,
            plan,
            Vec::<VariantAllocation>::new(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryExperimentRepository::new();
        let created = repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();
        assert_eq!(created.version(), 0);

        let fetched = repo.get(&ExperimentId::new("exp-1").unwrap()).await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().id().as_str(), "exp-1");
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let repo = InMemoryExperimentRepository::new();
        repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();

        let err = repo
            .create(test_experiment("exp-1", "camp-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemoryExperimentRepository::new();
        let created = repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();

        let mut loaded = created.clone();
        loaded.apply(LifecycleAction::Start).unwrap();

        let updated = repo.update(loaded).await.unwrap();
        assert_eq!(updated.version(), 1);
        assert_eq!(updated.state(), ExperimentState::Running);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = InMemoryExperimentRepository::new();
        let created = repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();

        // Two callers load version 0
        let mut first = created.clone();
        let mut second = created.clone();

        first.apply(LifecycleAction::Start).unwrap();
        repo.update(first).await.unwrap();

        // The second write is based on a version that has moved on
        second.apply(LifecycleAction::Start).unwrap();
        let err = repo.update(second).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_not_found() {
        let repo = InMemoryExperimentRepository::new();
        let err = repo
            .update(test_experiment("exp-1", "camp-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryExperimentRepository::new();
        repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();

        let id = ExperimentId::new("exp-1").unwrap();
        assert!(repo.delete(&id).await.unwrap());
        assert!(!repo.delete(&id).await.unwrap());
        assert!(repo.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = InMemoryExperimentRepository::new();
        repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();
        repo.create(test_experiment("exp-2", "camp-1")).await.unwrap();
        repo.create(test_experiment("exp-3", "camp-2")).await.unwrap();

        let all = repo.list(&ExperimentQuery::new()).await.unwrap();
        assert_eq!(all.len(), 3);

        let camp_1 = repo
            .list(&ExperimentQuery::new().with_campaign("camp-1"))
            .await
            .unwrap();
        assert_eq!(camp_1.len(), 2);

        let running = repo
            .list(&ExperimentQuery::new().with_state(ExperimentState::Running))
            .await
            .unwrap();
        assert!(running.is_empty());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let repo = InMemoryExperimentRepository::new();
        for i in 1..=5 {
            repo.create(test_experiment(&format!("exp-{}", i), "camp-1"))
                .await
                .unwrap();
        }

        let page = repo
            .list(&ExperimentQuery::new().with_limit(2).with_offset(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let tail = repo
            .list(&ExperimentQuery::new().with_offset(4))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn test_exists_and_count_defaults() {
        let repo = InMemoryExperimentRepository::new();
        repo.create(test_experiment("exp-1", "camp-1")).await.unwrap();

        assert!(repo.exists(&ExperimentId::new("exp-1").unwrap()).await.unwrap());
        assert!(!repo.exists(&ExperimentId::new("exp-9").unwrap()).await.unwrap());
        assert_eq!(repo.count(&ExperimentQuery::new()).await.unwrap(), 1);
    }
}
