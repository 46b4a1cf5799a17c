//! Cyclefuse - reconciles fertile-window predictions from multiple sources.
//!
//! This library fuses independent fertile-window predictions for a single
//! menstrual cycle - each produced by a different tracking app or method -
//! into one unified window with a calibrated confidence and a lay-readable
//! explanation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Cyclefuse                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌────────────┐    ┌──────────────┐       │
//! │  │ CSV       │───▶│ Predictors │───▶│  Reconciler  │       │
//! │  │ Import    │    │ (calendar, │    │ (fuse, score,│       │
//! │  │           │    │  symptoms) │    │  explain)    │       │
//! │  └───────────┘    └────────────┘    └──────────────┘       │
//! │        │                 ▲                  │               │
//! │        ▼                 │                  ▼               │
//! │  ┌───────────┐    ┌────────────┐    ┌──────────────┐       │
//! │  │  Record   │    │  External  │    │   Quality    │       │
//! │  │  Store    │    │ Predictions│    │  Assessment  │       │
//! │  └───────────┘    └────────────┘    └──────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage of the pipeline is a pure function over its inputs: no
//! shared state, no I/O, no suspension points. Collaborators that load
//! data asynchronously materialize their inputs before calling in, and
//! any "current time" is passed in explicitly.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use cyclefuse::model::SourceWeights;
//! use cyclefuse::predict::{predict_from_calendar, CalendarParams};
//! use cyclefuse::reconcile::{reconcile, ReconcileOptions};
//!
//! let start = "2025-02-01".parse().unwrap();
//! let prediction = predict_from_calendar(start, &[], &CalendarParams::default(), Utc::now());
//!
//! let result = reconcile(
//!     &[prediction],
//!     &SourceWeights::new(),
//!     &ReconcileOptions::default(),
//! )
//! .expect("one admissible prediction always reconciles");
//! assert!(result.confidence > 0.0);
//! ```

pub mod config;
pub mod dates;
pub mod import;
pub mod insights;
pub mod model;
pub mod predict;
pub mod reconcile;
pub mod server;
pub mod store;

// Re-export key types at crate root for convenience
pub use config::Config;
pub use model::{
    CervicalMucus, Cycle, Observation, ObservationKind, ObservationValue, OpkResult, Prediction,
    Source, SourceWeights,
};
pub use reconcile::{
    reconcile, QualityAssessment, ReconcileOptions, ReconciledPrediction,
};
pub use store::RecordStore;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
