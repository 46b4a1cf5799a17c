//! In-memory record store for cycles, predictions, and observations.
//!
//! Realizes the persistence contract the pipeline consumes: primary-id
//! lookup, secondary-key queries, ordered listings, single-record upsert
//! and delete, and a batch clear. Records are durable for the lifetime of
//! the store; the core itself never touches this module.

use crate::model::{Cycle, Observation, ObservationKind, Prediction, Source};
use chrono::NaiveDate;
use std::collections::HashMap;

/// The three record collections behind the pipeline.
#[derive(Debug, Default)]
pub struct RecordStore {
    cycles: HashMap<String, Cycle>,
    predictions: HashMap<String, Prediction>,
    observations: HashMap<String, Observation>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Cycles

    /// Insert or replace a cycle by id.
    pub fn upsert_cycle(&mut self, cycle: Cycle) {
        self.cycles.insert(cycle.id.clone(), cycle);
    }

    pub fn cycle(&self, id: &str) -> Option<&Cycle> {
        self.cycles.get(id)
    }

    pub fn cycles_by_start_date(&self, date: NaiveDate) -> Vec<&Cycle> {
        let mut matches: Vec<&Cycle> = self
            .cycles
            .values()
            .filter(|c| c.start_date == date)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// All cycles, most recent start date first.
    pub fn cycles(&self) -> Vec<Cycle> {
        let mut all: Vec<Cycle> = self.cycles.values().cloned().collect();
        all.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));
        all
    }

    pub fn delete_cycle(&mut self, id: &str) -> bool {
        self.cycles.remove(id).is_some()
    }

    // Predictions

    /// Insert or replace a prediction by id.
    pub fn upsert_prediction(&mut self, prediction: Prediction) {
        self.predictions.insert(prediction.id.clone(), prediction);
    }

    pub fn prediction(&self, id: &str) -> Option<&Prediction> {
        self.predictions.get(id)
    }

    pub fn predictions_by_source(&self, source: &Source) -> Vec<&Prediction> {
        let mut matches: Vec<&Prediction> = self
            .predictions
            .values()
            .filter(|p| &p.source == source)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    pub fn predictions_for_cycle(&self, cycle_id: &str) -> Vec<&Prediction> {
        let mut matches: Vec<&Prediction> = self
            .predictions
            .values()
            .filter(|p| p.cycle_id.as_deref() == Some(cycle_id))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// All predictions, most recent window start first.
    pub fn predictions(&self) -> Vec<Prediction> {
        let mut all: Vec<Prediction> = self.predictions.values().cloned().collect();
        all.sort_by(|a, b| b.fertile_start.cmp(&a.fertile_start).then(a.id.cmp(&b.id)));
        all
    }

    pub fn delete_prediction(&mut self, id: &str) -> bool {
        self.predictions.remove(id).is_some()
    }

    // Observations

    /// Insert or replace an observation by id.
    pub fn upsert_observation(&mut self, observation: Observation) {
        self.observations
            .insert(observation.id.clone(), observation);
    }

    pub fn observation(&self, id: &str) -> Option<&Observation> {
        self.observations.get(id)
    }

    pub fn observations_on(&self, date: NaiveDate) -> Vec<&Observation> {
        let mut matches: Vec<&Observation> = self
            .observations
            .values()
            .filter(|o| o.date == date)
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    pub fn observations_of_kind(&self, kind: ObservationKind) -> Vec<&Observation> {
        let mut matches: Vec<&Observation> = self
            .observations
            .values()
            .filter(|o| o.kind() == kind)
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        matches
    }

    /// Observations within an inclusive date range, ascending.
    pub fn observations_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Observation> {
        let mut matches: Vec<&Observation> = self
            .observations
            .values()
            .filter(|o| o.date >= start && o.date <= end)
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        matches
    }

    /// All observations, most recent date first.
    pub fn observations(&self) -> Vec<Observation> {
        let mut all: Vec<Observation> = self.observations.values().cloned().collect();
        all.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        all
    }

    pub fn delete_observation(&mut self, id: &str) -> bool {
        self.observations.remove(id).is_some()
    }

    /// Drop every record in every collection.
    pub fn clear(&mut self) {
        self.cycles.clear();
        self.predictions.clear();
        self.observations.clear();
    }
}
