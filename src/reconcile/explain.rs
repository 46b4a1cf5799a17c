//! Human-readable explanations for a reconciled window.
//!
//! Notes are emitted in a fixed order: the source listing, the agreement
//! label, the window itself, then any outlier and peak-day callouts.

use crate::model::Prediction;
use crate::reconcile::DayProbability;
use chrono::NaiveDate;

/// Days at or above this probability qualify for the peak-fertility note.
const PEAK_PROBABILITY: f64 = 0.8;

/// Label for an agreement score.
pub fn agreement_label(agreement: f64) -> &'static str {
    if agreement >= 0.9 {
        "strong"
    } else if agreement >= 0.7 {
        "good"
    } else if agreement >= 0.5 {
        "moderate"
    } else {
        "low"
    }
}

/// Explanation for a successfully extracted window.
pub fn build(
    admitted: &[&Prediction],
    agreement: f64,
    fertile_start: NaiveDate,
    fertile_end: NaiveDate,
    outliers: &[String],
    day_probabilities: &[DayProbability],
) -> Vec<String> {
    let mut notes = Vec::new();
    notes.push(source_note(admitted));
    notes.push(format!(
        "{} agreement between sources",
        capitalize(agreement_label(agreement))
    ));
    notes.push(window_note(fertile_start, fertile_end));
    if !outliers.is_empty() {
        notes.push(format!(
            "Note: {} differ significantly from consensus",
            outliers.join(", ")
        ));
    }
    if let Some(peak) = peak_fertility_day(day_probabilities) {
        notes.push(format!("Peak fertility on {peak}"));
    }
    notes
}

/// Explanation when no day cleared the threshold and the most trusted
/// source's window was returned verbatim.
pub fn build_fallback(chosen: &Prediction, admitted: &[&Prediction], agreement: f64) -> Vec<String> {
    let mut notes = Vec::new();
    notes.push(format!(
        "Low confidence: no consensus window, using the {} prediction",
        chosen.source.as_tag()
    ));
    notes.push(source_note(admitted));
    notes.push(format!(
        "{} agreement between sources",
        capitalize(agreement_label(agreement))
    ));
    notes.push(window_note(chosen.fertile_start, chosen.fertile_end));
    notes
}

fn source_note(admitted: &[&Prediction]) -> String {
    let mut tags: Vec<&str> = Vec::new();
    for prediction in admitted {
        let tag = prediction.source.as_tag();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if admitted.len() == 1 {
        format!("Based on {} only", tags[0])
    } else {
        format!(
            "Reconciled from {} predictions ({})",
            admitted.len(),
            tags.join(", ")
        )
    }
}

fn window_note(fertile_start: NaiveDate, fertile_end: NaiveDate) -> String {
    let days = (fertile_end - fertile_start).num_days() + 1;
    format!("Fertile window {fertile_start} to {fertile_end} ({days} days)")
}

/// The highest-probability day among days at or above 0.8, if any.
fn peak_fertility_day(day_probabilities: &[DayProbability]) -> Option<NaiveDate> {
    let mut peak: Option<&DayProbability> = None;
    for day in day_probabilities {
        if day.probability >= PEAK_PROBABILITY
            && peak.map_or(true, |best| day.probability > best.probability)
        {
            peak = Some(day);
        }
    }
    peak.map(|day| day.date)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
