//! Decision engine
//!
//! Pure mapping from a significance result to a recommended action. Keeping
//! this separate from the evaluator lets policy change without touching the
//! statistics.

use crate::domain::experiment::{RecommendedAction, SignificanceReason, SignificanceResult};

/// Recommends what to do with a running experiment
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Recommend an action:
    /// - a significant result declares its winner
    /// - full sample with no variant over the bar stops inconclusive
    /// - anything else keeps collecting
    pub fn decide(&self, significance: &SignificanceResult) -> RecommendedAction {
        if significance.is_significant {
            return RecommendedAction::DeclareWinner;
        }

        match significance.reason {
            Some(SignificanceReason::BelowConfidenceBar) => RecommendedAction::StopInconclusive,
            _ => RecommendedAction::ContinueTest,
        }
    }
}
