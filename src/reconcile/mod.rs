//! Fusion of independent fertile-window predictions.
//!
//! This module contains:
//! - The reconciliation engine that fuses N predictions into one window
//!   with a calibrated confidence and diagnostics
//! - Explanation building for lay users
//! - An input-data quality assessor for the surrounding pipeline
//!
//! Everything here is a pure function over its inputs: no I/O, no shared
//! state, no suspension points. For a fixed input the output is
//! byte-identical; prediction iteration preserves the caller's order.

pub mod engine;
pub mod explain;
pub mod quality;

use chrono::NaiveDate;
use serde::Serialize;

// Re-export commonly used types
pub use engine::reconcile;
pub use quality::{assess_quality, FactorImpact, QualityAssessment, QualityBand, QualityFactor};

/// Knobs for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Base day-probability cutoff for fertile days
    pub min_confidence_threshold: f64,
    /// Extra cutoff applied in proportion to disagreement
    pub disagreement_penalty: f64,
    /// Minimum number of input predictions before reconciling at all
    pub min_sources: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.3,
            disagreement_penalty: 0.15,
            min_sources: 1,
        }
    }
}

/// Probability that one calendar day is fertile, per the fused evidence.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProbability {
    pub date: NaiveDate,
    pub probability: f64,
}

/// The effective weight applied to one source tag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceWeightEntry {
    pub source: String,
    pub weight: f64,
}

/// Diagnostics carried alongside the reconciled window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// How tightly the inputs cluster in date space, in [0, 1]
    pub source_agreement: f64,
    /// Source tags of predictions far from the weighted centroid,
    /// in input order, duplicates permitted
    pub outlier_sources: Vec<String>,
    /// Effective weight per source tag, unique, in input order
    pub effective_weights: Vec<SourceWeightEntry>,
    /// Day-probability series, ascending by date
    pub day_probabilities: Vec<DayProbability>,
    /// Number of admitted input predictions
    pub input_predictions: usize,
}

/// The pipeline's output: a unified window with confidence, explanations,
/// and diagnostics. A pure value; the core does not persist it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledPrediction {
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ovulation_date: Option<NaiveDate>,
    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
    /// Short human-readable notes, most significant first
    pub explanation: Vec<String>,
    pub diagnostics: Diagnostics,
}
