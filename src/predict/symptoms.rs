//! Symptom-based prediction from daily CM/OPK/BBT observations.
//!
//! Observations are aggregated per day into a combined fertility score,
//! then the window is located from the strongest available signal: an LH
//! surge if one exists, otherwise the cervical-mucus peak. A post-hoc
//! BBT-shift detector confirms ovulation after the fact; it is diagnostic
//! only and never feeds the reconciler.

use crate::dates::add_days;
use crate::model::{CervicalMucus, Observation, ObservationValue, OpkResult, Prediction, Source};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Sustained rise above baseline that confirms a thermal shift.
const BBT_SHIFT_THRESHOLD_F: f64 = 0.2;

/// Readings required before the shift detector will run.
const BBT_MIN_READINGS: usize = 6;

/// Tunable parameters for the symptom method.
#[derive(Debug, Clone)]
pub struct SymptomOptions {
    /// Minimum CM score for a day to count as a fertile-mucus signal
    pub min_cm_score: u32,
    /// Fertile days before the first positive OPK
    pub days_before_opk: i64,
    /// Fertile days after the first positive OPK
    pub days_after_opk: i64,
    /// Contribution of the CM score to the combined day score
    pub cm_weight: f64,
    /// Contribution of a positive OPK to the combined day score
    pub opk_weight: f64,
}

impl Default for SymptomOptions {
    fn default() -> Self {
        Self {
            min_cm_score: 3,
            days_before_opk: 2,
            days_after_opk: 2,
            cm_weight: 0.6,
            opk_weight: 0.9,
        }
    }
}

/// Aggregated signals for one calendar day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySignal {
    pub date: NaiveDate,
    /// Cervical-mucus fertility score, 0-5
    pub cm_score: u32,
    pub opk_positive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbt_f: Option<f64>,
    /// Combined score in [0, 1]
    pub fertility_score: f64,
}

/// A confirmed post-ovulatory temperature rise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BbtShift {
    pub date: NaiveDate,
    pub confirmed: bool,
}

/// Fertility score for a cervical-mucus quality.
fn cm_score(mucus: CervicalMucus) -> u32 {
    match mucus {
        CervicalMucus::Dry => 0,
        CervicalMucus::Sticky => 1,
        CervicalMucus::Creamy => 2,
        CervicalMucus::Watery => 4,
        CervicalMucus::EggWhite => 5,
        CervicalMucus::Spotting => 1,
    }
}

/// Group observations by date and compute per-day signals, ascending.
pub fn aggregate_daily(observations: &[Observation], options: &SymptomOptions) -> Vec<DailySignal> {
    let mut days: BTreeMap<NaiveDate, (u32, bool, Option<f64>)> = BTreeMap::new();
    for observation in observations {
        let entry = days.entry(observation.date).or_insert((0, false, None));
        match &observation.value {
            ObservationValue::CervicalMucus(mucus) => {
                // Several readings on one day keep the strongest signal.
                entry.0 = entry.0.max(cm_score(*mucus));
            }
            ObservationValue::Opk(OpkResult::Positive) => entry.1 = true,
            ObservationValue::Opk(_) => {}
            ObservationValue::Bbt { temp_f, .. } => entry.2 = Some(*temp_f),
            ObservationValue::Symptom { .. } => {}
        }
    }

    days.into_iter()
        .map(|(date, (cm, opk_positive, bbt_f))| {
            let opk_part = if opk_positive { options.opk_weight } else { 0.0 };
            let score = (f64::from(cm) / 5.0) * options.cm_weight + opk_part;
            DailySignal {
                date,
                cm_score: cm,
                opk_positive,
                bbt_f,
                fertility_score: score.min(1.0),
            }
        })
        .collect()
}

/// Predict the fertile window from daily observations.
///
/// Returns `None` when neither an OPK surge nor a fertile-mucus day
/// exists; insufficient data is not an error. The emitted source tag is
/// `fertility-friend` (the symptom-app weight class).
pub fn predict_from_symptoms(
    observations: &[Observation],
    options: &SymptomOptions,
    now: DateTime<Utc>,
) -> Option<Prediction> {
    let days = aggregate_daily(observations, options);
    if days.is_empty() {
        return None;
    }

    let opk_day = days.iter().find(|d| d.opk_positive).map(|d| d.date);
    let high_cm_days: Vec<&DailySignal> = days
        .iter()
        .filter(|d| d.cm_score >= options.min_cm_score)
        .collect();

    let (fertile_start, fertile_end, ovulation_date) = if let Some(surge) = opk_day {
        (
            add_days(surge, -options.days_before_opk),
            add_days(surge, options.days_after_opk),
            add_days(surge, 1),
        )
    } else if let Some(first_high) = high_cm_days.first() {
        // Peak day is the highest score; earlier days tie-break by date.
        let peak = high_cm_days
            .iter()
            .copied()
            .fold(high_cm_days[0], |best, day| {
                if day.cm_score > best.cm_score {
                    day
                } else {
                    best
                }
            });
        (
            first_high.date,
            add_days(peak.date, 2),
            add_days(peak.date, 1),
        )
    } else {
        return None;
    };

    let has_opk = opk_day.is_some();
    let has_cm = !high_cm_days.is_empty();

    let mut confidence = 40i32;
    if has_opk {
        confidence += 35;
    }
    if has_cm {
        confidence += 15;
    }
    if observations.len() >= 10 {
        confidence += 10;
    } else if observations.len() >= 5 {
        confidence += 5;
    }
    if has_opk && has_cm {
        confidence += 10;
    }
    let confidence = confidence.min(95) as u8;

    Some(Prediction::new(
        Source::FertilityFriend,
        fertile_start,
        fertile_end,
        Some(ovulation_date),
        confidence,
        now,
    ))
}

/// Detect a sustained basal-temperature shift.
///
/// Baseline is the mean of the lowest five of the first six readings; the
/// shift is the first reading from index six onward where three
/// consecutive readings sit at least 0.2°F above baseline.
pub fn detect_bbt_shift(observations: &[Observation]) -> Option<BbtShift> {
    let mut readings: Vec<(NaiveDate, f64)> = observations
        .iter()
        .filter_map(|o| match &o.value {
            ObservationValue::Bbt { temp_f, .. } => Some((o.date, *temp_f)),
            _ => None,
        })
        .collect();
    if readings.len() < BBT_MIN_READINGS {
        return None;
    }
    readings.sort_by_key(|(date, _)| *date);

    let mut baseline_window: Vec<f64> = readings[..BBT_MIN_READINGS]
        .iter()
        .map(|(_, temp)| *temp)
        .collect();
    baseline_window.sort_by(|a, b| a.total_cmp(b));
    let baseline: f64 =
        baseline_window[..BBT_MIN_READINGS - 1].iter().sum::<f64>() / (BBT_MIN_READINGS - 1) as f64;
    let threshold = baseline + BBT_SHIFT_THRESHOLD_F;

    for index in BBT_MIN_READINGS..readings.len().saturating_sub(2) {
        let sustained = readings[index..index + 3]
            .iter()
            .all(|(_, temp)| *temp >= threshold);
        if sustained {
            return Some(BbtShift {
                date: readings[index].0,
                confirmed: true,
            });
        }
    }
    None
}
