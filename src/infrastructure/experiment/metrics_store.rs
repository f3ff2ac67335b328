//! In-memory metrics store backed by atomic counters
//!
//! Increments go through `AtomicU64::fetch_add`, so concurrent events for the
//! same variant never lose updates; the outer lock is only held to resolve
//! the counter cell, never across the increment itself.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::experiment::{MetricEvent, MetricsStore, VariantMetrics};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct VariantCounters {
    impressions: AtomicU64,
    clicks: AtomicU64,
    conversions: AtomicU64,
    cost_micros: AtomicU64,
}

impl VariantCounters {
    fn load(&self) -> VariantMetrics {
        VariantMetrics {
            impressions: self.impressions.load(Ordering::Relaxed),
            clicks: self.clicks.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            cost_micros: self.cost_micros.load(Ordering::Relaxed),
        }
    }

    fn zero(&self) {
        self.impressions.store(0, Ordering::Relaxed);
        self.clicks.store(0, Ordering::Relaxed);
        self.conversions.store(0, Ordering::Relaxed);
        self.cost_micros.store(0, Ordering::Relaxed);
    }
}

/// In-memory implementation of [`MetricsStore`]
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    counters: RwLock<HashMap<String, HashMap<String, Arc<VariantCounters>>>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn variant_counters(
        &self,
        experiment_id: &str,
        variant_id: &str,
    ) -> Result<Arc<VariantCounters>, DomainError> {
        let counters = self.counters.read().await;
        let variants = counters.get(experiment_id).ok_or_else(|| {
            DomainError::not_found(format!(
                "No metrics registered for experiment '{}'",
                experiment_id
            ))
        })?;
        variants
            .get(variant_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "Unknown variant '{}' for experiment '{}'",
                    variant_id, experiment_id
                ))
            })
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn register(
        &self,
        experiment_id: &str,
        variant_ids: &[String],
    ) -> Result<(), DomainError> {
        let mut counters = self.counters.write().await;
        let variants = counters.entry(experiment_id.to_string()).or_default();

        for variant_id in variant_ids {
            variants
                .entry(variant_id.clone())
                .or_insert_with(|| Arc::new(VariantCounters::default()));
        }

        debug!(experiment_id, variants = variant_ids.len(), "Registered metric counters");
        Ok(())
    }

    async fn record(
        &self,
        experiment_id: &str,
        variant_id: &str,
        event: MetricEvent,
        amount_micros: u64,
    ) -> Result<VariantMetrics, DomainError> {
        let cell = self.variant_counters(experiment_id, variant_id).await?;

        match event {
            MetricEvent::Impression => cell.impressions.fetch_add(1, Ordering::Relaxed),
            MetricEvent::Click => cell.clicks.fetch_add(1, Ordering::Relaxed),
            MetricEvent::Conversion => cell.conversions.fetch_add(1, Ordering::Relaxed),
            MetricEvent::Cost => cell.cost_micros.fetch_add(amount_micros, Ordering::Relaxed),
        };

        Ok(cell.load())
    }

    async fn snapshot(
        &self,
        experiment_id: &str,
    ) -> Result<BTreeMap<String, VariantMetrics>, DomainError> {
        let counters = self.counters.read().await;
        let variants = counters.get(experiment_id).ok_or_else(|| {
            DomainError::not_found(format!(
                "No metrics registered for experiment '{}'",
                experiment_id
            ))
        })?;

        Ok(variants
            .iter()
            .map(|(variant_id, cell)| (variant_id.clone(), cell.load()))
            .collect())
    }

    async fn reset(&self, experiment_id: &str, variant_id: &str) -> Result<(), DomainError> {
        let cell = self.variant_counters(experiment_id, variant_id).await?;
        cell.zero();
        debug!(experiment_id, variant_id, "Reset metric counters");
        Ok(())
    }

    async fn remove(&self, experiment_id: &str) -> Result<(), DomainError> {
        let mut counters = self.counters.write().await;
        counters.remove(experiment_id);
        Ok(())
    }
}
