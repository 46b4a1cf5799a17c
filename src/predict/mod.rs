//! Primary predictors that synthesize fertile-window predictions from raw
//! user data.
//!
//! This module contains:
//! - A calendar predictor over historical cycle lengths
//! - A symptom predictor over daily CM/OPK/BBT observations, with a
//!   post-hoc BBT-shift detector

pub mod calendar;
pub mod symptoms;

// Re-export commonly used types
pub use calendar::{predict_from_calendar, project_cycles, CalendarParams};
pub use symptoms::{
    aggregate_daily, detect_bbt_shift, predict_from_symptoms, BbtShift, DailySignal,
    SymptomOptions,
};
