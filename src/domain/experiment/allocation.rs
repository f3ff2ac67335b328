//! Variant allocations and the tracking contract emitted to the delivery
//! layer
//!
//! The engine only specifies what must be generated; tagging outbound
//! campaign URLs and pixels with these values is the delivery collaborator's
//! responsibility.

use serde::{Deserialize, Serialize};

use super::entity::VariantId;

/// Canonical attribution tags for one variant. Derived deterministically from
/// the experiment ID and variant name, so the same inputs always produce the
/// same tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionTags {
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
}

/// Tracking contract for one variant: a stable tracking-event identifier, the
/// attribution tags, and the conversion events the delivery layer must report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingContract {
    pub tracking_event_id: String,
    pub tags: AttributionTags,
    pub conversion_events: Vec<String>,
}

/// Traffic allocation for one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAllocation {
    variant_id: VariantId,
    traffic_split: f64,
    tracking: TrackingContract,
}

impl VariantAllocation {
    pub fn new(variant_id: VariantId, traffic_split: f64, tracking: TrackingContract) -> Self {
        Self {
            variant_id,
            traffic_split,
            tracking,
        }
    }

    pub fn variant_id(&self) -> &VariantId {
        &self.variant_id
    }

    pub fn traffic_split(&self) -> f64 {
        self.traffic_split
    }

    pub fn tracking(&self) -> &TrackingContract {
        &self.tracking
    }
}
