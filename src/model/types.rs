//! Record types shared by the predictors, the reconciler, and the store.
//!
//! Observations are a tagged variant over four kinds; the kind is fixed at
//! construction and never mutated. Predictions carry a source tag used as a
//! dispatch key into the weight table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// A historical menstrual cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    /// First day of menses
    pub start_date: NaiveDate,
    /// Total cycle length in days, typically 21-35
    pub length: u32,
    /// Period length in days, typically 3-7; never exceeds `length`
    pub period_length: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Cycle {
    /// Create a cycle with a fresh identifier. `period_length` is capped at
    /// `length` and `length` floored at 1 to hold the record invariants.
    pub fn new(start_date: NaiveDate, length: u32, period_length: u32, now: DateTime<Utc>) -> Self {
        let length = length.max(1);
        let timestamp = now.to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            start_date,
            length,
            period_length: period_length.min(length),
            notes: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }
}

/// Cervical-mucus quality, ordered roughly by fertility signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CervicalMucus {
    Dry,
    Sticky,
    Creamy,
    Watery,
    EggWhite,
    Spotting,
}

/// Ovulation-test readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpkResult {
    Negative,
    AlmostPositive,
    Positive,
    Invalid,
}

/// The value carried by an observation, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum ObservationValue {
    CervicalMucus(CervicalMucus),
    #[serde(rename_all = "camelCase")]
    Bbt {
        /// Basal body temperature in Fahrenheit, typically 95.0-101.0
        temp_f: f64,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        time_of_day: Option<String>,
    },
    Opk(OpkResult),
    Symptom {
        name: String,
        /// Severity 1-3 when reported
        #[serde(skip_serializing_if = "Option::is_none", default)]
        severity: Option<u8>,
    },
}

/// Observation kind discriminant, used for store lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationKind {
    CervicalMucus,
    Bbt,
    Opk,
    Symptom,
}

/// A single dated data point.
///
/// Multiple observations of different kinds may share a date; duplicate
/// kind+date pairs are permitted and treated as independent evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub value: ObservationValue,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Observation {
    /// Create an observation with a fresh identifier.
    pub fn new(date: NaiveDate, value: ObservationValue, now: DateTime<Utc>) -> Self {
        let timestamp = now.to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            value,
            notes: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    /// The kind tag matching this observation's value.
    pub fn kind(&self) -> ObservationKind {
        match self.value {
            ObservationValue::CervicalMucus(_) => ObservationKind::CervicalMucus,
            ObservationValue::Bbt { .. } => ObservationKind::Bbt,
            ObservationValue::Opk(_) => ObservationKind::Opk,
            ObservationValue::Symptom { .. } => ObservationKind::Symptom,
        }
    }
}

/// Where a prediction came from.
///
/// Unknown tags are accepted and carried through as `Other`; they weigh
/// the fallback 0.5 in the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    NaturalCycles,
    FertilityFriend,
    FertileAlgorithm,
    Flo,
    Clue,
    Ovia,
    Manual,
    Symptoms,
    Calendar,
    Other(String),
}

impl Source {
    /// The canonical wire tag for this source.
    pub fn as_tag(&self) -> &str {
        match self {
            Source::NaturalCycles => "natural-cycles",
            Source::FertilityFriend => "fertility-friend",
            Source::FertileAlgorithm => "fertile-algorithm",
            Source::Flo => "flo",
            Source::Clue => "clue",
            Source::Ovia => "ovia",
            Source::Manual => "manual",
            Source::Symptoms => "symptoms",
            Source::Calendar => "calendar",
            Source::Other(tag) => tag,
        }
    }

    /// Parse a wire tag; anything unrecognized becomes `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "natural-cycles" => Source::NaturalCycles,
            "fertility-friend" => Source::FertilityFriend,
            "fertile-algorithm" => Source::FertileAlgorithm,
            "flo" => Source::Flo,
            "clue" => Source::Clue,
            "ovia" => Source::Ovia,
            "manual" => Source::Manual,
            "symptoms" => Source::Symptoms,
            "calendar" => Source::Calendar,
            other => Source::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Source::from_tag(&tag))
    }
}

/// A fertile-window claim from one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub source: Source,
    pub fertile_start: NaiveDate,
    /// Inclusive; never precedes `fertile_start`
    pub fertile_end: NaiveDate,
    /// A source may place this outside its own window; the reconciler
    /// tolerates the dissent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ovulation_date: Option<NaiveDate>,
    /// Self-reported confidence in [0, 100]
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cycle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Predictions imported without a confidence default to 50.
fn default_confidence() -> u8 {
    50
}

impl Prediction {
    /// Create a prediction with a fresh identifier. Swapped window bounds
    /// are reordered so `fertile_start <= fertile_end` always holds.
    pub fn new(
        source: Source,
        fertile_start: NaiveDate,
        fertile_end: NaiveDate,
        ovulation_date: Option<NaiveDate>,
        confidence: u8,
        now: DateTime<Utc>,
    ) -> Self {
        let (fertile_start, fertile_end) = if fertile_start <= fertile_end {
            (fertile_start, fertile_end)
        } else {
            (fertile_end, fertile_start)
        };
        let timestamp = now.to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            fertile_start,
            fertile_end,
            ovulation_date,
            confidence: confidence.min(100),
            cycle_id: None,
            notes: None,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    /// Window length in days, inclusive of both ends.
    pub fn window_days(&self) -> i64 {
        (self.fertile_end - self.fertile_start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_cycle_invariants_held_at_construction() {
        let cycle = Cycle::new(date("2025-01-01"), 0, 9, Utc::now());
        assert_eq!(cycle.length, 1);
        assert!(cycle.period_length <= cycle.length);
    }

    #[test]
    fn test_observation_kind_matches_value() {
        let now = Utc::now();
        let obs = Observation::new(
            date("2025-01-01"),
            ObservationValue::Opk(OpkResult::Positive),
            now,
        );
        assert_eq!(obs.kind(), ObservationKind::Opk);

        let obs = Observation::new(
            date("2025-01-01"),
            ObservationValue::Bbt {
                temp_f: 97.3,
                time_of_day: None,
            },
            now,
        );
        assert_eq!(obs.kind(), ObservationKind::Bbt);
    }

    #[test]
    fn test_observation_serializes_kebab_case_kind() {
        let obs = Observation::new(
            date("2025-01-01"),
            ObservationValue::CervicalMucus(CervicalMucus::EggWhite),
            Utc::now(),
        );
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["kind"], "cervical-mucus");
        assert_eq!(json["value"], "egg-white");
        assert_eq!(json["date"], "2025-01-01");
    }

    #[test]
    fn test_source_tag_round_trip() {
        for tag in [
            "natural-cycles",
            "fertility-friend",
            "fertile-algorithm",
            "flo",
            "clue",
            "ovia",
            "manual",
            "symptoms",
            "calendar",
            "some-new-app",
        ] {
            assert_eq!(Source::from_tag(tag).as_tag(), tag);
        }
    }

    #[test]
    fn test_prediction_reorders_swapped_window() {
        let p = Prediction::new(
            Source::Manual,
            date("2025-02-15"),
            date("2025-02-10"),
            None,
            70,
            Utc::now(),
        );
        assert!(p.fertile_start <= p.fertile_end);
        assert_eq!(p.window_days(), 6);
    }

    #[test]
    fn test_prediction_confidence_defaults_on_deserialize() {
        let p: Prediction = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "source": "flo",
            "fertileStart": "2025-02-10",
            "fertileEnd": "2025-02-15",
            "createdAt": "2025-02-01T00:00:00Z",
            "updatedAt": "2025-02-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(p.confidence, 50);
        assert_eq!(p.source, Source::Flo);
    }
}
