//! Prior trust per prediction source.
//!
//! Weights are configuration, not learned state. Callers supply overrides
//! by value; the defaults below are the authoritative table.

use crate::model::types::Source;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight applied to sources absent from both the override map and the
/// default table.
pub const FALLBACK_WEIGHT: f64 = 0.5;

/// The default weight for a known source tag.
fn default_weight(source: &Source) -> f64 {
    match source {
        Source::NaturalCycles => 0.95,
        Source::FertilityFriend => 0.90,
        Source::FertileAlgorithm => 0.85,
        Source::Symptoms => 0.75,
        Source::Flo => 0.70,
        Source::Clue => 0.70,
        Source::Ovia => 0.65,
        Source::Manual => 0.60,
        Source::Calendar => 0.55,
        Source::Other(_) => FALLBACK_WEIGHT,
    }
}

/// A source-tag -> weight mapping with the default table underneath.
///
/// Serializes as a plain JSON object of tag -> weight overrides, which is
/// also the shape carried in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceWeights {
    overrides: HashMap<String, f64>,
}

impl SourceWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the weight for a source tag. Values are clamped to [0, 1].
    pub fn set(&mut self, tag: impl Into<String>, weight: f64) {
        self.overrides.insert(tag.into(), weight.clamp(0.0, 1.0));
    }

    /// Effective weight for a source: override first, then the default
    /// table, then the 0.5 fallback.
    pub fn weight(&self, source: &Source) -> f64 {
        if let Some(weight) = self.overrides.get(source.as_tag()) {
            return weight.clamp(0.0, 1.0);
        }
        default_weight(source)
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}
