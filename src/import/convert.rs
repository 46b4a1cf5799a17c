//! Lift parsed CSV rows into canonical observations and inferred cycles.

use crate::import::csv::{CsvOpk, MucusReading, RawObservationRow};
use crate::model::{CervicalMucus, Cycle, Observation, ObservationValue, OpkResult};
use chrono::{DateTime, NaiveDate, Utc};

/// Observation gap that starts a new inferred cycle.
const CYCLE_GAP_DAYS: i64 = 8;

/// Minimum span for an inferred cycle to be kept.
const MIN_CYCLE_SPAN_DAYS: i64 = 14;

/// Default period length assumed for inferred cycles.
const INFERRED_PERIOD_DAYS: u32 = 5;

/// Convert raw rows into canonical observations, one per present kind.
///
/// Kinds whose normalized value is unknown are dropped; OPK peak collapses
/// to positive. Fresh identifiers are minted per emitted observation and
/// row notes carry over to each.
pub fn rows_to_observations(rows: &[RawObservationRow], now: DateTime<Utc>) -> Vec<Observation> {
    let mut observations = Vec::new();
    for row in rows {
        if let Some(reading) = row.cervical_fluid {
            if let Some(mucus) = to_cervical_mucus(reading) {
                observations.push(observation_with_notes(
                    row.date,
                    ObservationValue::CervicalMucus(mucus),
                    row.notes.clone(),
                    now,
                ));
            }
        }
        if let Some(temp_f) = row.temperature_f {
            observations.push(observation_with_notes(
                row.date,
                ObservationValue::Bbt {
                    temp_f,
                    time_of_day: None,
                },
                row.notes.clone(),
                now,
            ));
        }
        if let Some(opk) = row.opk {
            if let Some(result) = to_opk_result(opk) {
                observations.push(observation_with_notes(
                    row.date,
                    ObservationValue::Opk(result),
                    row.notes.clone(),
                    now,
                ));
            }
        }
        if row.intercourse == Some(true) {
            observations.push(observation_with_notes(
                row.date,
                ObservationValue::Symptom {
                    name: "intercourse".to_string(),
                    severity: None,
                },
                row.notes.clone(),
                now,
            ));
        }
    }
    observations
}

/// Infer cycle records from gaps in an observation stream.
///
/// A new cycle begins after any gap of [`CYCLE_GAP_DAYS`] or more; segments
/// spanning fewer than [`MIN_CYCLE_SPAN_DAYS`] days are discarded.
pub fn infer_cycles(observations: &[Observation], now: DateTime<Utc>) -> Vec<Cycle> {
    let mut dates: Vec<NaiveDate> = observations.iter().map(|o| o.date).collect();
    dates.sort();
    dates.dedup();
    if dates.is_empty() {
        return Vec::new();
    }

    let mut cycles = Vec::new();
    let mut segment_start = dates[0];
    let mut segment_end = dates[0];
    for &date in &dates[1..] {
        if (date - segment_end).num_days() >= CYCLE_GAP_DAYS {
            push_segment(&mut cycles, segment_start, segment_end, now);
            segment_start = date;
        }
        segment_end = date;
    }
    push_segment(&mut cycles, segment_start, segment_end, now);
    cycles
}

fn push_segment(cycles: &mut Vec<Cycle>, start: NaiveDate, end: NaiveDate, now: DateTime<Utc>) {
    let span = (end - start).num_days() + 1;
    if span < MIN_CYCLE_SPAN_DAYS {
        return;
    }
    let mut cycle = Cycle::new(start, span as u32, INFERRED_PERIOD_DAYS, now);
    cycle.notes = Some("inferred from imported observations".to_string());
    cycles.push(cycle);
}

fn observation_with_notes(
    date: NaiveDate,
    value: ObservationValue,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Observation {
    let mut observation = Observation::new(date, value, now);
    observation.notes = notes;
    observation
}

fn to_cervical_mucus(reading: MucusReading) -> Option<CervicalMucus> {
    match reading {
        MucusReading::Dry => Some(CervicalMucus::Dry),
        MucusReading::Sticky => Some(CervicalMucus::Sticky),
        MucusReading::Creamy => Some(CervicalMucus::Creamy),
        MucusReading::Watery => Some(CervicalMucus::Watery),
        MucusReading::EggWhite => Some(CervicalMucus::EggWhite),
        MucusReading::Spotting => Some(CervicalMucus::Spotting),
        MucusReading::Unknown => None,
    }
}

fn to_opk_result(opk: CsvOpk) -> Option<OpkResult> {
    match opk {
        CsvOpk::Negative => Some(OpkResult::Negative),
        // Peak is the strongest positive signal the export vocabulary has.
        CsvOpk::Positive | CsvOpk::Peak => Some(OpkResult::Positive),
        CsvOpk::Unknown => None,
    }
}
