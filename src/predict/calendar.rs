//! Calendar-method prediction from historical cycle lengths.
//!
//! Ovulation is back-solved from the average cycle length and an assumed
//! luteal phase, then bracketed into a fertile window. Confidence reflects
//! how much history exists and how regular it is.

use crate::dates::add_days;
use crate::model::{Cycle, Prediction, Source};
use chrono::{DateTime, NaiveDate, Utc};

/// Average cycle length assumed when no history exists.
const DEFAULT_CYCLE_LENGTH: i64 = 28;

/// Length standard deviation assumed with fewer than two cycles.
const DEFAULT_LENGTH_STDEV: f64 = 5.0;

/// Tunable parameters for the calendar method.
#[derive(Debug, Clone)]
pub struct CalendarParams {
    /// Days from ovulation to the next menses
    pub luteal_phase_days: i64,
    /// Fertile days before the estimated ovulation
    pub days_before_ovulation: i64,
    /// Fertile days after the estimated ovulation
    pub days_after_ovulation: i64,
    /// Confidence bonus for very regular histories
    pub regularity_bonus: i32,
}

impl Default for CalendarParams {
    fn default() -> Self {
        Self {
            luteal_phase_days: 14,
            days_before_ovulation: 5,
            days_after_ovulation: 1,
            regularity_bonus: 10,
        }
    }
}

/// Predict the fertile window for the cycle starting at `cycle_start`.
///
/// Always yields a prediction; an empty history falls back to a 28-day
/// average. The emitted source tag is `manual` (the calendar weight class).
pub fn predict_from_calendar(
    cycle_start: NaiveDate,
    history: &[Cycle],
    params: &CalendarParams,
    now: DateTime<Utc>,
) -> Prediction {
    let average_length = average_cycle_length(history);
    let ovulation_offset = average_length - params.luteal_phase_days;

    let fertile_start = add_days(cycle_start, ovulation_offset - params.days_before_ovulation);
    let fertile_end = add_days(cycle_start, ovulation_offset + params.days_after_ovulation);
    let ovulation_date = add_days(cycle_start, ovulation_offset);

    Prediction::new(
        Source::Manual,
        fertile_start,
        fertile_end,
        Some(ovulation_date),
        confidence(history, params),
        now,
    )
}

/// Project `count` consecutive cycles forward.
///
/// Each prediction is seeded at the previous seed plus the average cycle
/// length; confidence decays by 10 per projected cycle with a floor of 20.
pub fn project_cycles(
    cycle_start: NaiveDate,
    history: &[Cycle],
    params: &CalendarParams,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Prediction> {
    let average_length = average_cycle_length(history);
    let mut predictions = Vec::with_capacity(count);
    let mut seed = cycle_start;
    for index in 0..count {
        let mut prediction = predict_from_calendar(seed, history, params, now);
        let decayed = i32::from(prediction.confidence) - 10 * index as i32;
        prediction.confidence = decayed.max(20) as u8;
        predictions.push(prediction);
        seed = add_days(seed, average_length);
    }
    predictions
}

/// Rounded mean of historical lengths, or the 28-day default.
fn average_cycle_length(history: &[Cycle]) -> i64 {
    if history.is_empty() {
        return DEFAULT_CYCLE_LENGTH;
    }
    let sum: u64 = history.iter().map(|c| u64::from(c.length)).sum();
    (sum as f64 / history.len() as f64).round() as i64
}

/// Population standard deviation of historical lengths.
fn length_stdev(history: &[Cycle]) -> f64 {
    if history.len() < 2 {
        return DEFAULT_LENGTH_STDEV;
    }
    let mean = history.iter().map(|c| f64::from(c.length)).sum::<f64>() / history.len() as f64;
    let variance = history
        .iter()
        .map(|c| (f64::from(c.length) - mean).powi(2))
        .sum::<f64>()
        / history.len() as f64;
    variance.sqrt()
}

/// Confidence from 55, adjusted for history depth then regularity, clamped
/// to [20, 80] after each step.
fn confidence(history: &[Cycle], params: &CalendarParams) -> u8 {
    let mut confidence = 55i32;

    if history.len() >= 6 {
        confidence += 10;
    } else if history.len() >= 3 {
        confidence += 5;
    }
    confidence = confidence.clamp(20, 80);

    let stdev = length_stdev(history);
    if stdev <= 2.0 {
        confidence += params.regularity_bonus;
    } else if stdev <= 4.0 {
        confidence += params.regularity_bonus / 2;
    } else if stdev > 6.0 {
        confidence -= 15;
    }
    confidence.clamp(20, 80) as u8
}
