//! Data-quality insights over cycle history and observations.
//!
//! Surfaces regularity, drift, statistical anomalies, and per-cycle flags
//! for display; nothing here feeds back into the prediction pipeline.

use crate::model::{Cycle, Observation, ObservationKind};
use serde::Serialize;

/// Z-score beyond which a cycle length is anomalous.
const ANOMALY_Z_SCORE: f64 = 2.0;

/// Cycle lengths outside this range are flagged.
const CYCLE_LENGTH_RANGE: (u32, u32) = (21, 35);

/// Period lengths above this are flagged.
const MAX_TYPICAL_PERIOD: u32 = 7;

/// How regular the cycle history looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regularity {
    Regular,
    SomewhatRegular,
    Irregular,
}

/// A cycle whose length sits far from the historical mean.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleAnomaly {
    pub cycle_id: String,
    pub length: u32,
    pub z_score: f64,
}

/// The reason a cycle was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleFlag {
    ShortCycle,
    LongCycle,
    LongPeriod,
}

/// One flagged cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedCycle {
    pub cycle_id: String,
    pub flag: CycleFlag,
    pub description: String,
}

/// Counts of observations by kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationCoverage {
    pub total: usize,
    pub bbt: usize,
    pub opk: usize,
    pub cervical_mucus: usize,
    pub symptom: usize,
}

/// The full insight report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInsights {
    pub cycle_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_cycle_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_stdev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regularity: Option<Regularity>,
    /// Mean length of the more recent half minus the older half, in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_days: Option<f64>,
    pub anomalies: Vec<CycleAnomaly>,
    pub flags: Vec<FlaggedCycle>,
    pub coverage: ObservationCoverage,
}

/// Analyze cycle history and observation coverage.
pub fn analyze(cycles: &[Cycle], observations: &[Observation]) -> DataInsights {
    let mut insights = DataInsights {
        cycle_count: cycles.len(),
        mean_cycle_length: None,
        length_stdev: None,
        regularity: None,
        drift_days: None,
        anomalies: Vec::new(),
        flags: flag_cycles(cycles),
        coverage: coverage(observations),
    };

    if cycles.is_empty() {
        return insights;
    }

    let mean = cycles.iter().map(|c| f64::from(c.length)).sum::<f64>() / cycles.len() as f64;
    insights.mean_cycle_length = Some(mean);

    if cycles.len() >= 2 {
        let variance = cycles
            .iter()
            .map(|c| (f64::from(c.length) - mean).powi(2))
            .sum::<f64>()
            / cycles.len() as f64;
        let stdev = variance.sqrt();
        insights.length_stdev = Some(stdev);
        insights.regularity = Some(if stdev <= 2.0 {
            Regularity::Regular
        } else if stdev <= 4.0 {
            Regularity::SomewhatRegular
        } else {
            Regularity::Irregular
        });

        if stdev > 0.0 {
            insights.anomalies = cycles
                .iter()
                .filter_map(|cycle| {
                    let z = (f64::from(cycle.length) - mean) / stdev;
                    (z.abs() > ANOMALY_Z_SCORE).then(|| CycleAnomaly {
                        cycle_id: cycle.id.clone(),
                        length: cycle.length,
                        z_score: z,
                    })
                })
                .collect();
        }
    }

    if cycles.len() >= 4 {
        insights.drift_days = Some(drift(cycles));
    }

    insights
}

/// Mean length of the newer half minus the older half, ordered by start
/// date. Positive drift means cycles are getting longer.
fn drift(cycles: &[Cycle]) -> f64 {
    let mut ordered: Vec<&Cycle> = cycles.iter().collect();
    ordered.sort_by_key(|c| c.start_date);
    let half = ordered.len() / 2;
    let older = &ordered[..half];
    let newer = &ordered[ordered.len() - half..];
    let mean = |slice: &[&Cycle]| {
        slice.iter().map(|c| f64::from(c.length)).sum::<f64>() / slice.len() as f64
    };
    mean(newer) - mean(older)
}

fn flag_cycles(cycles: &[Cycle]) -> Vec<FlaggedCycle> {
    let mut flags = Vec::new();
    for cycle in cycles {
        if cycle.length < CYCLE_LENGTH_RANGE.0 {
            flags.push(FlaggedCycle {
                cycle_id: cycle.id.clone(),
                flag: CycleFlag::ShortCycle,
                description: format!("cycle of {} days is unusually short", cycle.length),
            });
        } else if cycle.length > CYCLE_LENGTH_RANGE.1 {
            flags.push(FlaggedCycle {
                cycle_id: cycle.id.clone(),
                flag: CycleFlag::LongCycle,
                description: format!("cycle of {} days is unusually long", cycle.length),
            });
        }
        if cycle.period_length > MAX_TYPICAL_PERIOD {
            flags.push(FlaggedCycle {
                cycle_id: cycle.id.clone(),
                flag: CycleFlag::LongPeriod,
                description: format!("period of {} days is unusually long", cycle.period_length),
            });
        }
    }
    flags
}

fn coverage(observations: &[Observation]) -> ObservationCoverage {
    let mut coverage = ObservationCoverage {
        total: observations.len(),
        ..ObservationCoverage::default()
    };
    for observation in observations {
        match observation.kind() {
            ObservationKind::Bbt => coverage.bbt += 1,
            ObservationKind::Opk => coverage.opk += 1,
            ObservationKind::CervicalMucus => coverage.cervical_mucus += 1,
            ObservationKind::Symptom => coverage.symptom += 1,
        }
    }
    coverage
}
