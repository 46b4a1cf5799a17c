//! The reconciliation engine.
//!
//! Predictions are admitted, scored for mutual agreement, screened for
//! outliers, and fused into a per-day probability series from which the
//! unified window is extracted. When no day clears the effective
//! threshold the engine falls back to the most trusted single source.

use crate::dates::{add_days, date_range, day_number, days_between};
use crate::model::{Prediction, SourceWeights};
use crate::reconcile::explain;
use crate::reconcile::{
    DayProbability, Diagnostics, ReconcileOptions, ReconciledPrediction, SourceWeightEntry,
};
use chrono::NaiveDate;

/// Days either side of the union range covered by the probability series.
const RANGE_PADDING_DAYS: i64 = 2;

/// Distance from the weighted centroid beyond which a prediction is an
/// outlier, in days.
const OUTLIER_DISTANCE_DAYS: f64 = 3.0;

/// Tail contributions below this are discarded from the day series.
const MIN_CONTRIBUTION: f64 = 0.1;

/// Fuse predictions into a unified window.
///
/// Returns `None` when fewer than `min_sources` predictions are supplied
/// or when every prediction carries zero confidence; both are absence of
/// evidence, not errors.
pub fn reconcile(
    predictions: &[Prediction],
    weights: &SourceWeights,
    options: &ReconcileOptions,
) -> Option<ReconciledPrediction> {
    if predictions.len() < options.min_sources {
        return None;
    }
    let admitted: Vec<&Prediction> = predictions.iter().filter(|p| p.confidence > 0).collect();
    if admitted.is_empty() {
        return None;
    }

    let prediction_weights: Vec<f64> = admitted.iter().map(|p| weights.weight(&p.source)).collect();
    let agreement = source_agreement(&admitted);
    let outliers = find_outliers(&admitted, &prediction_weights);
    let day_probabilities = day_probability_series(&admitted, &prediction_weights);
    let threshold = effective_threshold(agreement, options);

    let diagnostics = Diagnostics {
        source_agreement: agreement,
        outlier_sources: outliers.clone(),
        effective_weights: unique_weights(&admitted, &prediction_weights),
        day_probabilities: day_probabilities.clone(),
        input_predictions: admitted.len(),
    };

    if let Some(window) = extract_window(&day_probabilities, threshold) {
        let confidence = synthesize_confidence(agreement, admitted.len(), outliers.len());
        let explanation = explain::build(
            &admitted,
            agreement,
            window.start,
            window.end,
            &outliers,
            &day_probabilities,
        );
        Some(ReconciledPrediction {
            fertile_start: window.start,
            fertile_end: window.end,
            ovulation_date: Some(window.peak),
            confidence,
            explanation,
            diagnostics,
        })
    } else {
        let chosen = most_trusted(&admitted, &prediction_weights);
        let confidence = (agreement * 0.5).max(0.2);
        let explanation = explain::build_fallback(chosen, &admitted, agreement);
        Some(ReconciledPrediction {
            fertile_start: chosen.fertile_start,
            fertile_end: chosen.fertile_end,
            ovulation_date: chosen.ovulation_date,
            confidence,
            explanation,
            diagnostics,
        })
    }
}

/// Agreement in [0, 1]: `exp(-v/8)` over the mean of the population
/// variances of start and end dates. Zero spread scores 1.0, a 4-day
/// variance about 0.6, a 9-day variance about 0.3.
fn source_agreement(admitted: &[&Prediction]) -> f64 {
    if admitted.len() < 2 {
        return 1.0;
    }
    let starts: Vec<f64> = admitted
        .iter()
        .map(|p| day_number(p.fertile_start) as f64)
        .collect();
    let ends: Vec<f64> = admitted
        .iter()
        .map(|p| day_number(p.fertile_end) as f64)
        .collect();
    let variance = (population_variance(&starts) + population_variance(&ends)) / 2.0;
    (-variance / 8.0).exp()
}

/// Biased (divide-by-N) variance; the agreement thresholds are calibrated
/// against this form.
fn population_variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Source tags of predictions whose start or end sits more than three
/// days from the weighted centroid. Empty below three predictions, where
/// a centroid is not meaningful.
fn find_outliers(admitted: &[&Prediction], prediction_weights: &[f64]) -> Vec<String> {
    if admitted.len() < 3 {
        return Vec::new();
    }
    let total: f64 = prediction_weights.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let centroid_start = admitted
        .iter()
        .zip(prediction_weights)
        .map(|(p, w)| w * day_number(p.fertile_start) as f64)
        .sum::<f64>()
        / total;
    let centroid_end = admitted
        .iter()
        .zip(prediction_weights)
        .map(|(p, w)| w * day_number(p.fertile_end) as f64)
        .sum::<f64>()
        / total;

    admitted
        .iter()
        .filter(|p| {
            (day_number(p.fertile_start) as f64 - centroid_start).abs() > OUTLIER_DISTANCE_DAYS
                || (day_number(p.fertile_end) as f64 - centroid_end).abs() > OUTLIER_DISTANCE_DAYS
        })
        .map(|p| p.source.as_tag().to_string())
        .collect()
}

/// Per-day fused probability over the union range padded by two days.
///
/// Inside a prediction's window a day earns `weight * confidence`;
/// outside, the contribution decays as `exp(-k^2/2)` with the day distance
/// `k` to the nearer window edge, and tails below 0.1 are discarded. The
/// sum is normalized by the fixed total of effective weights, so a day can
/// only exceed 1.0 when every source fully covers it at full confidence;
/// values are intentionally not clipped.
fn day_probability_series(
    admitted: &[&Prediction],
    prediction_weights: &[f64],
) -> Vec<DayProbability> {
    let range_start = admitted.iter().map(|p| p.fertile_start).min().expect("admitted is non-empty");
    let range_end = admitted.iter().map(|p| p.fertile_end).max().expect("admitted is non-empty");
    let total_weight: f64 = prediction_weights.iter().sum();

    date_range(
        add_days(range_start, -RANGE_PADDING_DAYS),
        add_days(range_end, RANGE_PADDING_DAYS),
    )
    .into_iter()
    .map(|date| {
        let mut sum = 0.0;
        for (prediction, weight) in admitted.iter().zip(prediction_weights) {
            let confidence = f64::from(prediction.confidence) / 100.0;
            if date >= prediction.fertile_start && date <= prediction.fertile_end {
                sum += weight * confidence;
            } else {
                let k = days_between(date, prediction.fertile_start)
                    .min(days_between(date, prediction.fertile_end)) as f64;
                let tail = weight * confidence * (-k * k / 2.0).exp();
                if tail >= MIN_CONTRIBUTION {
                    sum += tail;
                }
            }
        }
        let probability = if total_weight > 0.0 {
            sum / total_weight
        } else {
            0.0
        };
        DayProbability { date, probability }
    })
    .collect()
}

/// The day-probability cutoff, raised when sources disagree.
fn effective_threshold(agreement: f64, options: &ReconcileOptions) -> f64 {
    let mut threshold = options.min_confidence_threshold;
    if agreement < 0.7 {
        threshold += options.disagreement_penalty * (1.0 - agreement);
    }
    threshold
}

struct ExtractedWindow {
    start: NaiveDate,
    end: NaiveDate,
    peak: NaiveDate,
}

/// Longest run of consecutive days at or above the threshold; the run's
/// highest-probability day is the ovulation estimate. Earliest run and
/// earliest peak win ties by scan order.
fn extract_window(days: &[DayProbability], threshold: f64) -> Option<ExtractedWindow> {
    let fertile: Vec<&DayProbability> = days
        .iter()
        .filter(|d| d.probability >= threshold)
        .collect();
    if fertile.is_empty() {
        return None;
    }

    let mut best = (0usize, 0usize);
    let mut run_start = 0usize;
    for i in 1..=fertile.len() {
        let run_breaks =
            i == fertile.len() || (fertile[i].date - fertile[i - 1].date).num_days() != 1;
        if run_breaks {
            if i - 1 - run_start > best.1 - best.0 {
                best = (run_start, i - 1);
            }
            run_start = i;
        }
    }

    let run = &fertile[best.0..=best.1];
    let peak = run
        .iter()
        .copied()
        .fold(run[0], |best, day| {
            if day.probability > best.probability {
                day
            } else {
                best
            }
        });
    Some(ExtractedWindow {
        start: run[0].date,
        end: run[run.len() - 1].date,
        peak: peak.date,
    })
}

/// `agreement * breadth * outlier penalty`, clamped to [0, 1]. Breadth
/// saturates at four sources; each outlier costs 10% down to half.
fn synthesize_confidence(agreement: f64, admitted: usize, outliers: usize) -> f64 {
    let breadth = (0.7 + 0.1 * admitted as f64).min(1.0);
    let outlier_penalty = (1.0 - 0.1 * outliers as f64).max(0.5);
    (agreement * breadth * outlier_penalty).clamp(0.0, 1.0)
}

/// The admitted prediction with the highest effective weight; first seen
/// wins ties.
fn most_trusted<'a>(admitted: &[&'a Prediction], prediction_weights: &[f64]) -> &'a Prediction {
    let mut best_index = 0usize;
    for (index, weight) in prediction_weights.iter().enumerate() {
        if *weight > prediction_weights[best_index] {
            best_index = index;
        }
    }
    admitted[best_index]
}

/// Effective weight per unique source tag, in input order.
fn unique_weights(admitted: &[&Prediction], prediction_weights: &[f64]) -> Vec<SourceWeightEntry> {
    let mut entries: Vec<SourceWeightEntry> = Vec::new();
    for (prediction, weight) in admitted.iter().zip(prediction_weights) {
        let tag = prediction.source.as_tag();
        if entries.iter().all(|e| e.source != tag) {
            entries.push(SourceWeightEntry {
                source: tag.to_string(),
                weight: *weight,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn prediction(source: &str, start: &str, end: &str, confidence: u8) -> Prediction {
        Prediction::new(
            Source::from_tag(source),
            date(start),
            date(end),
            None,
            confidence,
            Utc::now(),
        )
    }

    fn reconcile_default(predictions: &[Prediction]) -> Option<ReconciledPrediction> {
        reconcile(
            predictions,
            &SourceWeights::new(),
            &ReconcileOptions::default(),
        )
    }

    #[test]
    fn test_single_prediction_agrees_with_itself() {
        let result =
            reconcile_default(&[prediction("flo", "2025-02-10", "2025-02-15", 70)]).unwrap();
        assert_eq!(result.diagnostics.input_predictions, 1);
        assert_eq!(result.diagnostics.source_agreement, 1.0);
        assert!(result.diagnostics.outlier_sources.is_empty());
        assert!(result.explanation[0].contains("flo"));
    }

    #[test]
    fn test_zero_confidence_predictions_are_inadmissible() {
        assert!(reconcile_default(&[prediction("flo", "2025-02-10", "2025-02-15", 0)]).is_none());

        // One live prediction among dead ones still reconciles.
        let result = reconcile_default(&[
            prediction("flo", "2025-02-10", "2025-02-15", 0),
            prediction("clue", "2025-02-10", "2025-02-15", 60),
        ])
        .unwrap();
        assert_eq!(result.diagnostics.input_predictions, 1);
    }

    #[test]
    fn test_min_sources_gate() {
        let options = ReconcileOptions {
            min_sources: 3,
            ..ReconcileOptions::default()
        };
        let predictions = vec![
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("clue", "2025-02-10", "2025-02-15", 70),
        ];
        assert!(reconcile(&predictions, &SourceWeights::new(), &options).is_none());
    }

    #[test]
    fn test_identical_predictions_full_agreement() {
        let predictions = vec![
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("clue", "2025-02-10", "2025-02-15", 75),
            prediction("ovia", "2025-02-10", "2025-02-15", 65),
        ];
        let result = reconcile_default(&predictions).unwrap();
        assert_eq!(result.diagnostics.source_agreement, 1.0);
        assert!(result.confidence >= 0.8);
        assert!(result.diagnostics.outlier_sources.is_empty());
        assert!(result.fertile_start >= date("2025-02-08"));
        assert!(result.fertile_start <= date("2025-02-10"));
        assert!(result.fertile_end >= date("2025-02-15"));
        assert!(result.fertile_end <= date("2025-02-17"));
    }

    #[test]
    fn test_day_probabilities_positive_inside_windows() {
        let predictions = vec![
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("clue", "2025-02-11", "2025-02-14", 80),
        ];
        let result = reconcile_default(&predictions).unwrap();
        for day in &result.diagnostics.day_probabilities {
            assert!(day.probability >= 0.0);
            if day.date >= date("2025-02-11") && day.date <= date("2025-02-14") {
                assert!(day.probability > 0.0);
            }
        }
        // Ascending by date.
        for pair in result.diagnostics.day_probabilities.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn test_outlier_detection_needs_three() {
        let predictions = vec![
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("manual", "2025-02-01", "2025-02-06", 70),
        ];
        let result = reconcile_default(&predictions).unwrap();
        assert!(result.diagnostics.outlier_sources.is_empty());
    }

    #[test]
    fn test_far_outlier_reported_and_penalized() {
        let agreeing = vec![
            prediction("natural-cycles", "2025-02-10", "2025-02-15", 70),
            prediction("fertility-friend", "2025-02-10", "2025-02-15", 75),
            prediction("flo", "2025-02-10", "2025-02-15", 65),
        ];
        let baseline = reconcile_default(&agreeing).unwrap();

        let mut with_outlier = agreeing.clone();
        with_outlier.push(prediction("manual", "2025-02-01", "2025-02-06", 70));
        let result = reconcile_default(&with_outlier).unwrap();

        assert_eq!(result.diagnostics.outlier_sources, vec!["manual"]);
        assert!(result.confidence < baseline.confidence);
    }

    #[test]
    fn test_disjoint_windows_low_agreement() {
        let predictions = vec![
            prediction("flo", "2025-02-05", "2025-02-10", 70),
            prediction("clue", "2025-02-12", "2025-02-17", 70),
        ];
        let result = reconcile_default(&predictions).unwrap();
        assert!(result.diagnostics.source_agreement < 0.5);
        assert!(result.confidence < 0.5);
    }

    #[test]
    fn test_fallback_returns_most_trusted_verbatim() {
        let predictions = vec![
            prediction("manual", "2025-02-01", "2025-02-05", 60),
            prediction("natural-cycles", "2025-02-20", "2025-02-25", 60),
        ];
        let options = ReconcileOptions {
            min_confidence_threshold: 0.99,
            ..ReconcileOptions::default()
        };
        let result = reconcile(&predictions, &SourceWeights::new(), &options).unwrap();
        assert_eq!(result.fertile_start, date("2025-02-20"));
        assert_eq!(result.fertile_end, date("2025-02-25"));
        assert!(result.explanation[0].starts_with("Low confidence"));
        assert!(result.explanation[0].contains("natural-cycles"));
        assert!(result.confidence >= 0.2);
        assert_eq!(result.diagnostics.input_predictions, 2);
        assert!(!result.diagnostics.day_probabilities.is_empty());
    }

    #[test]
    fn test_permutation_invariance() {
        let predictions = vec![
            prediction("flo", "2025-02-09", "2025-02-14", 70),
            prediction("clue", "2025-02-10", "2025-02-15", 80),
            prediction("ovia", "2025-02-11", "2025-02-16", 60),
        ];
        let forward = reconcile_default(&predictions).unwrap();

        let mut reversed = predictions.clone();
        reversed.reverse();
        let backward = reconcile_default(&reversed).unwrap();

        assert_eq!(forward.fertile_start, backward.fertile_start);
        assert_eq!(forward.fertile_end, backward.fertile_end);
        assert!((forward.confidence - backward.confidence).abs() < 1e-9);

        let mut forward_outliers = forward.diagnostics.outlier_sources.clone();
        let mut backward_outliers = backward.diagnostics.outlier_sources.clone();
        forward_outliers.sort();
        backward_outliers.sort();
        assert_eq!(forward_outliers, backward_outliers);
    }

    #[test]
    fn test_min_sources_matches_relaxed_gate_when_met() {
        let predictions = vec![
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("clue", "2025-02-11", "2025-02-16", 75),
        ];
        let strict = reconcile(
            &predictions,
            &SourceWeights::new(),
            &ReconcileOptions {
                min_sources: 2,
                ..ReconcileOptions::default()
            },
        )
        .unwrap();
        let relaxed = reconcile_default(&predictions).unwrap();
        assert_eq!(strict.fertile_start, relaxed.fertile_start);
        assert_eq!(strict.fertile_end, relaxed.fertile_end);
        assert_eq!(strict.confidence, relaxed.confidence);
    }

    #[test]
    fn test_confidence_bounded() {
        let predictions = vec![
            prediction("natural-cycles", "2025-02-10", "2025-02-15", 100),
            prediction("fertility-friend", "2025-02-10", "2025-02-15", 100),
            prediction("fertile-algorithm", "2025-02-10", "2025-02-15", 100),
            prediction("symptoms", "2025-02-10", "2025-02-15", 100),
            prediction("flo", "2025-02-10", "2025-02-15", 100),
        ];
        let result = reconcile_default(&predictions).unwrap();
        assert!(result.confidence <= 1.0);
        assert!(result.confidence >= 0.0);
    }

    #[test]
    fn test_effective_weights_unique_in_input_order() {
        let predictions = vec![
            prediction("clue", "2025-02-10", "2025-02-15", 70),
            prediction("flo", "2025-02-10", "2025-02-15", 70),
            prediction("clue", "2025-02-11", "2025-02-16", 70),
        ];
        let result = reconcile_default(&predictions).unwrap();
        let tags: Vec<&str> = result
            .diagnostics
            .effective_weights
            .iter()
            .map(|e| e.source.as_str())
            .collect();
        assert_eq!(tags, vec!["clue", "flo"]);
    }
}
