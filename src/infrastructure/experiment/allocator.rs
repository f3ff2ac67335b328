//! Variant allocator: traffic splits and tracking contracts
//!
//! Allocation is deterministic: the same experiment ID and configuration
//! always yield the same tracking event IDs and attribution tags, so retries
//! and replays cannot mint divergent contracts.

use std::hash::{DefaultHasher, Hash, Hasher};

use tracing::debug;

use crate::domain::experiment::{
    AttributionTags, ExperimentConfig, ExperimentId, TrackingContract, VariantAllocation,
};

const UTM_SOURCE: &str = "pulsebridge";
const UTM_MEDIUM: &str = "abtest";

/// Produces per-variant allocations for a validated configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantAllocator;

impl VariantAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Build one allocation per variant, in config order.
    ///
    /// The conversion events in each tracking contract are the names of the
    /// config's success metrics.
    pub fn allocate(
        &self,
        experiment_id: &ExperimentId,
        config: &ExperimentConfig,
    ) -> Vec<VariantAllocation> {
        let conversion_events: Vec<String> = config
            .success_metrics
            .iter()
            .map(|m| m.metric.clone())
            .collect();

        let allocations: Vec<VariantAllocation> = config
            .variants
            .iter()
            .map(|variant| {
                let tracking = TrackingContract {
                    tracking_event_id: tracking_event_id(experiment_id, variant.name()),
                    tags: AttributionTags {
                        utm_source: UTM_SOURCE.to_string(),
                        utm_medium: UTM_MEDIUM.to_string(),
                        utm_campaign: config.campaign_id.clone(),
                        utm_content: utm_content(variant.name()),
                    },
                    conversion_events: conversion_events.clone(),
                };

                VariantAllocation::new(variant.id().clone(), variant.traffic_split(), tracking)
            })
            .collect();

        debug!(
            experiment_id = %experiment_id,
            variants = allocations.len(),
            "Allocated variants"
        );

        allocations
    }
}

/// Stable tracking event ID derived from the experiment ID and variant name
fn tracking_event_id(experiment_id: &ExperimentId, variant_name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    experiment_id.as_str().hash(&mut hasher);
    variant_name.hash(&mut hasher);
    format!("evt-{:016x}", hasher.finish())
}

/// utm_content value: variant name lowercased with whitespace runs replaced by
/// underscores
fn utm_content(variant_name: &str) -> String {
    variant_name
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
