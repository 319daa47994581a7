//! Confidence estimation over included relevance scores
//!
//! The estimate is a pure function of the scores of passages that made
//! it into the context block. Passages trimmed out by the token budget
//! never influence the result.

use serde::{Deserialize, Serialize};

use crate::config::ConfidenceThresholds;
use crate::context::ContextBlock;

/// Discrete confidence level for an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    None,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Estimate confidence from the relevance scores of included passages
    ///
    /// Empty input maps to `None`; otherwise the maximum score decides:
    /// above the high threshold is `High`, at or above the medium
    /// threshold is `Medium`, anything else is `Low`.
    pub fn from_scores(scores: impl IntoIterator<Item = f32>, thresholds: &ConfidenceThresholds) -> Self {
        let max = scores.into_iter().fold(f32::NEG_INFINITY, f32::max);

        if max == f32::NEG_INFINITY {
            ConfidenceLevel::None
        } else if max > thresholds.high {
            ConfidenceLevel::High
        } else if max >= thresholds.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// Estimate confidence for an assembled context block
    pub fn for_block(block: &ContextBlock, thresholds: &ConfidenceThresholds) -> Self {
        Self::from_scores(
            block.entries().iter().map(|e| e.passage.relevance_score),
            thresholds,
        )
    }
}
