//! Input-data quality assessment.
//!
//! Scores how well the supplied history and observations can support a
//! prediction, with named factors and actionable recommendations. The
//! assessment is advisory; it never alters the reconciled window.

use crate::model::{Cycle, Observation, ObservationKind, Prediction};
use serde::Serialize;
use std::collections::HashSet;

/// Overall quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityBand {
    fn from_score(score: i32) -> Self {
        if score >= 80 {
            QualityBand::Excellent
        } else if score >= 60 {
            QualityBand::Good
        } else if score >= 40 {
            QualityBand::Fair
        } else {
            QualityBand::Poor
        }
    }
}

/// Direction of a factor's influence on the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactorImpact {
    Positive,
    Negative,
    Neutral,
}

/// One named contribution to the quality score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFactor {
    pub name: String,
    pub impact: FactorImpact,
    pub description: String,
}

/// The assessor's output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityAssessment {
    pub band: QualityBand,
    pub score: i32,
    pub factors: Vec<QualityFactor>,
    pub recommendations: Vec<String>,
}

/// Score the input data for prediction quality.
///
/// Starts at 50 and adjusts for cycle history depth, cycle regularity,
/// OPK and cervical-mucus coverage, and corroborating external sources.
pub fn assess_quality(
    historical_cycles: &[Cycle],
    observations: &[Observation],
    external_predictions: &[Prediction],
) -> QualityAssessment {
    let mut score = 50i32;
    let mut factors = Vec::new();
    let mut recommendations = Vec::new();

    let cycle_count = historical_cycles.len();
    if cycle_count >= 6 {
        score += 15;
        factors.push(factor(
            "cycle-history",
            FactorImpact::Positive,
            format!("{cycle_count} logged cycles give a solid baseline"),
        ));
    } else if cycle_count >= 3 {
        score += 8;
        factors.push(factor(
            "cycle-history",
            FactorImpact::Positive,
            format!("{cycle_count} logged cycles give a usable baseline"),
        ));
        recommendations
            .push("Keep logging cycles; six or more sharpen the calendar estimate".to_string());
    } else {
        score -= 5;
        factors.push(factor(
            "cycle-history",
            FactorImpact::Negative,
            format!("only {cycle_count} logged cycles"),
        ));
        recommendations
            .push("Log at least three cycles so the calendar method has a baseline".to_string());
    }

    if cycle_count >= 2 {
        let stdev = length_stdev(historical_cycles);
        if stdev <= 2.0 {
            score += 10;
            factors.push(factor(
                "regularity",
                FactorImpact::Positive,
                format!("cycle lengths are very regular (stdev {stdev:.1} days)"),
            ));
        } else if stdev <= 4.0 {
            factors.push(factor(
                "regularity",
                FactorImpact::Neutral,
                format!("cycle lengths are moderately regular (stdev {stdev:.1} days)"),
            ));
        } else {
            score -= 10;
            factors.push(factor(
                "regularity",
                FactorImpact::Negative,
                format!("cycle lengths vary widely (stdev {stdev:.1} days)"),
            ));
            recommendations.push(
                "Irregular cycles weaken calendar estimates; lean on OPK and mucus tracking"
                    .to_string(),
            );
        }
    }

    let opk_count = observations
        .iter()
        .filter(|o| o.kind() == ObservationKind::Opk)
        .count();
    if opk_count > 0 {
        score += 20;
        factors.push(factor(
            "opk-tracking",
            FactorImpact::Positive,
            format!("{opk_count} ovulation test results on file"),
        ));
    } else {
        factors.push(factor(
            "opk-tracking",
            FactorImpact::Neutral,
            "no ovulation test results".to_string(),
        ));
        recommendations
            .push("Add ovulation test results; the LH surge pins down the window".to_string());
    }

    let cm_count = observations
        .iter()
        .filter(|o| o.kind() == ObservationKind::CervicalMucus)
        .count();
    if cm_count >= 7 {
        score += 10;
        factors.push(factor(
            "mucus-tracking",
            FactorImpact::Positive,
            format!("{cm_count} cervical mucus observations"),
        ));
    } else if cm_count >= 1 {
        score += 3;
        factors.push(factor(
            "mucus-tracking",
            FactorImpact::Positive,
            format!("{cm_count} cervical mucus observations"),
        ));
        recommendations.push("Track cervical mucus daily through the cycle".to_string());
    } else {
        factors.push(factor(
            "mucus-tracking",
            FactorImpact::Neutral,
            "no cervical mucus observations".to_string(),
        ));
        recommendations.push("Track cervical mucus daily through the cycle".to_string());
    }

    let external_sources: HashSet<&str> = external_predictions
        .iter()
        .map(|p| p.source.as_tag())
        .collect();
    if !external_sources.is_empty() {
        let counted = external_sources.len().min(3);
        score += 5 * counted as i32;
        factors.push(factor(
            "external-sources",
            FactorImpact::Positive,
            format!(
                "{} external prediction source(s) corroborate the data",
                external_sources.len()
            ),
        ));
    }

    let score = score.clamp(0, 100);
    QualityAssessment {
        band: QualityBand::from_score(score),
        score,
        factors,
        recommendations,
    }
}

fn factor(name: &str, impact: FactorImpact, description: String) -> QualityFactor {
    QualityFactor {
        name: name.to_string(),
        impact,
        description,
    }
}

fn length_stdev(cycles: &[Cycle]) -> f64 {
    let mean = cycles.iter().map(|c| f64::from(c.length)).sum::<f64>() / cycles.len() as f64;
    let variance = cycles
        .iter()
        .map(|c| (f64::from(c.length) - mean).powi(2))
        .sum::<f64>()
        / cycles.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservationValue, OpkResult, Source};
    use chrono::{NaiveDate, Utc};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn cycle(length: u32) -> Cycle {
        Cycle::new(date("2024-01-01"), length, 5, Utc::now())
    }

    fn opk_observation(day: &str) -> Observation {
        Observation::new(
            date(day),
            ObservationValue::Opk(OpkResult::Negative),
            Utc::now(),
        )
    }

    #[test]
    fn test_empty_inputs_score_fair_at_best() {
        let assessment = assess_quality(&[], &[], &[]);
        // 50 - 5 for missing history.
        assert_eq!(assessment.score, 45);
        assert_eq!(assessment.band, QualityBand::Fair);
        assert!(!assessment.recommendations.is_empty());
    }

    #[test]
    fn test_rich_inputs_score_excellent() {
        let cycles: Vec<Cycle> = (0..6).map(|_| cycle(28)).collect();
        let mut observations: Vec<Observation> = (1..=7)
            .map(|day| {
                Observation::new(
                    NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
                    ObservationValue::CervicalMucus(crate::model::CervicalMucus::Creamy),
                    Utc::now(),
                )
            })
            .collect();
        observations.push(opk_observation("2025-02-12"));
        let external = vec![Prediction::new(
            Source::Flo,
            date("2025-02-10"),
            date("2025-02-15"),
            None,
            70,
            Utc::now(),
        )];

        let assessment = assess_quality(&cycles, &observations, &external);
        // 50 + 15 + 10 + 20 + 10 + 5 = 100.
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.band, QualityBand::Excellent);
    }

    #[test]
    fn test_irregular_cycles_penalized() {
        let lengths = [21u32, 36, 24, 33];
        let cycles: Vec<Cycle> = lengths.iter().map(|&l| cycle(l)).collect();
        let assessment = assess_quality(&cycles, &[], &[]);
        // 50 + 8 - 10 = 48.
        assert_eq!(assessment.score, 48);
        assert!(assessment
            .factors
            .iter()
            .any(|f| f.name == "regularity" && f.impact == FactorImpact::Negative));
    }

    #[test]
    fn test_external_sources_capped_at_three() {
        let external: Vec<Prediction> = ["flo", "clue", "ovia", "natural-cycles"]
            .iter()
            .map(|tag| {
                Prediction::new(
                    Source::from_tag(tag),
                    date("2025-02-10"),
                    date("2025-02-15"),
                    None,
                    70,
                    Utc::now(),
                )
            })
            .collect();
        let with_four = assess_quality(&[], &[], &external);
        let with_three = assess_quality(&[], &[], &external[..3]);
        assert_eq!(with_four.score, with_three.score);
    }
}
