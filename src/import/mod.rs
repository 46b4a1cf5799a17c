//! CSV import for external daily-observation exports.
//!
//! This module contains:
//! - A tolerant parser that lifts one-row-per-day CSV text into raw
//!   observation rows with per-row errors and warnings
//! - A structural validator and a bounded preview
//! - Conversion of raw rows into canonical observations and inferred cycles

pub mod convert;
pub mod csv;

// Re-export commonly used types
pub use convert::{infer_cycles, rows_to_observations};
pub use csv::{
    parse_csv, preview_csv, validate_structure, CsvOpk, ImportIssue, ImportPreview, ImportResult,
    MucusReading, RawObservationRow, StructureValidation,
};
