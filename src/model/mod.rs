//! Domain model for the prediction pipeline.
//!
//! This module contains:
//! - Historical cycle and daily observation records
//! - Fertile-window predictions tagged with their source
//! - The source-weight table used by the reconciler

pub mod types;
pub mod weights;

// Re-export commonly used types
pub use types::{
    CervicalMucus, Cycle, Observation, ObservationKind, ObservationValue, OpkResult, Prediction,
    Source,
};
pub use weights::{SourceWeights, FALLBACK_WEIGHT};
