//! Tolerant parser for one-row-per-day CSV exports.
//!
//! Column discovery is forgiving: the date column is any header whose
//! lower-cased form contains `date`; the remaining fields are matched
//! through a static alias table and unknown columns are ignored. Row-level
//! failures drop the row and the rest of the file continues; advisory
//! conditions become warnings and never drop data.

use chrono::NaiveDate;
use serde::Serialize;

/// Header aliases for the temperature column.
const TEMPERATURE_ALIASES: &[&str] = &["temp", "temperature", "bbt"];
/// Header aliases for the cervical-fluid column.
const CERVICAL_FLUID_ALIASES: &[&str] = &["cervical fluid", "cf", "cm", "cervical mucus", "fluid"];
/// Header aliases for the OPK column.
const OPK_ALIASES: &[&str] = &["opk", "lh test", "ovulation test"];
/// Header aliases for the intercourse column.
const INTERCOURSE_ALIASES: &[&str] = &["intercourse", "bd", "sex"];
/// Header aliases for the notes column.
const NOTES_ALIASES: &[&str] = &["notes", "note", "comments", "memo"];

/// Plausible basal-temperature range in Fahrenheit; readings outside it
/// warn but are kept.
const TEMP_RANGE_F: (f64, f64) = (95.0, 101.0);

/// Normalized cervical-mucus vocabulary emitted by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MucusReading {
    Dry,
    Sticky,
    Creamy,
    Watery,
    EggWhite,
    Spotting,
    Unknown,
}

/// Normalized OPK vocabulary emitted by the parser. `Peak` collapses to
/// positive when rows are lifted into observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CsvOpk {
    Negative,
    Positive,
    Peak,
    Unknown,
}

/// One parsed data row, still in the external export's shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservationRow {
    /// 1-based line number in the source file (the header is line 1)
    pub line: usize,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cervical_fluid: Option<MucusReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opk: Option<CsvOpk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intercourse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A row-scoped error or warning.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    /// 1-based line number in the source file
    pub line: usize,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// The outcome of a parse: errors block success, warnings do not.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    /// Parsed rows, ascending by date
    pub rows: Vec<RawObservationRow>,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
}

/// Structural check of the header row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureValidation {
    pub valid: bool,
    pub missing_columns: Vec<String>,
    pub found_columns: Vec<String>,
}

/// A bounded preview of the parse.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub rows: Vec<RawObservationRow>,
    pub total_rows: usize,
    pub truncated: bool,
}

/// Discovered column positions within the header row.
#[derive(Debug, Clone, Default)]
struct ColumnMap {
    date: Option<usize>,
    temperature: Option<usize>,
    cervical_fluid: Option<usize>,
    opk: Option<usize>,
    intercourse: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    fn discover(header: &str) -> Self {
        let mut map = Self::default();
        for (index, cell) in header.split(',').enumerate() {
            let name = cell.trim().to_lowercase();
            if map.date.is_none() && name.contains("date") {
                map.date = Some(index);
            } else if map.temperature.is_none() && TEMPERATURE_ALIASES.contains(&name.as_str()) {
                map.temperature = Some(index);
            } else if map.cervical_fluid.is_none() && CERVICAL_FLUID_ALIASES.contains(&name.as_str())
            {
                map.cervical_fluid = Some(index);
            } else if map.opk.is_none() && OPK_ALIASES.contains(&name.as_str()) {
                map.opk = Some(index);
            } else if map.intercourse.is_none() && INTERCOURSE_ALIASES.contains(&name.as_str()) {
                map.intercourse = Some(index);
            } else if map.notes.is_none() && NOTES_ALIASES.contains(&name.as_str()) {
                map.notes = Some(index);
            }
        }
        map
    }

    fn found(&self) -> Vec<String> {
        let mut found = Vec::new();
        for (present, name) in [
            (self.date.is_some(), "date"),
            (self.temperature.is_some(), "temperature"),
            (self.cervical_fluid.is_some(), "cervicalFluid"),
            (self.opk.is_some(), "opk"),
            (self.intercourse.is_some(), "intercourse"),
            (self.notes.is_some(), "notes"),
        ] {
            if present {
                found.push(name.to_string());
            }
        }
        found
    }

    fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for (present, name) in [
            (self.date.is_some(), "date"),
            (self.temperature.is_some(), "temperature"),
            (self.cervical_fluid.is_some(), "cervicalFluid"),
            (self.opk.is_some(), "opk"),
            (self.intercourse.is_some(), "intercourse"),
            (self.notes.is_some(), "notes"),
        ] {
            if !present {
                missing.push(name.to_string());
            }
        }
        missing
    }
}

/// Validate the header row without parsing data.
pub fn validate_structure(text: &str) -> StructureValidation {
    let header = text.lines().next().unwrap_or("");
    let map = ColumnMap::discover(header);
    StructureValidation {
        valid: map.date.is_some(),
        missing_columns: map.missing(),
        found_columns: map.found(),
    }
}

/// Parse CSV text into raw observation rows.
///
/// The returned rows are sorted ascending by date. Duplicate dates warn
/// but every row is retained.
pub fn parse_csv(text: &str) -> ImportResult {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or("");
    let map = ColumnMap::discover(header);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(date_col) = map.date else {
        errors.push(ImportIssue {
            line: 1,
            field: "date".to_string(),
            message: "no date column found in header".to_string(),
            value: Some(header.to_string()),
        });
        return ImportResult {
            success: false,
            rows: Vec::new(),
            errors,
            warnings,
        };
    };

    let mut rows = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line_number = offset + 2;
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').collect();

        let Some(raw_date) = cells.get(date_col).map(|c| c.trim()) else {
            errors.push(ImportIssue {
                line: line_number,
                field: "date".to_string(),
                message: "row has no cell in the date column".to_string(),
                value: Some(line.to_string()),
            });
            continue;
        };
        if raw_date.is_empty() {
            errors.push(ImportIssue {
                line: line_number,
                field: "date".to_string(),
                message: "date cell is empty".to_string(),
                value: None,
            });
            continue;
        }
        let Some(date) = parse_row_date(raw_date) else {
            errors.push(ImportIssue {
                line: line_number,
                field: "date".to_string(),
                message: "unparseable date".to_string(),
                value: Some(raw_date.to_string()),
            });
            continue;
        };

        let mut row = RawObservationRow {
            line: line_number,
            date,
            temperature_f: None,
            cervical_fluid: None,
            opk: None,
            intercourse: None,
            notes: None,
        };

        if let Some(raw) = cell(&cells, map.temperature) {
            match parse_temperature(raw) {
                Some(temp) => {
                    if temp < TEMP_RANGE_F.0 || temp > TEMP_RANGE_F.1 {
                        warnings.push(ImportIssue {
                            line: line_number,
                            field: "temperature".to_string(),
                            message: format!(
                                "temperature outside {}-{} F",
                                TEMP_RANGE_F.0, TEMP_RANGE_F.1
                            ),
                            value: Some(raw.to_string()),
                        });
                    }
                    row.temperature_f = Some(temp);
                }
                None => {
                    warnings.push(ImportIssue {
                        line: line_number,
                        field: "temperature".to_string(),
                        message: "non-numeric temperature dropped".to_string(),
                        value: Some(raw.to_string()),
                    });
                }
            }
        }

        if let Some(raw) = cell(&cells, map.cervical_fluid) {
            let reading = normalize_cervical_fluid(raw);
            if reading == MucusReading::Unknown {
                warnings.push(ImportIssue {
                    line: line_number,
                    field: "cervicalFluid".to_string(),
                    message: "unrecognized cervical fluid value".to_string(),
                    value: Some(raw.to_string()),
                });
            }
            row.cervical_fluid = Some(reading);
        }

        if let Some(raw) = cell(&cells, map.opk) {
            let reading = normalize_opk(raw);
            if reading == CsvOpk::Unknown {
                warnings.push(ImportIssue {
                    line: line_number,
                    field: "opk".to_string(),
                    message: "unrecognized OPK value".to_string(),
                    value: Some(raw.to_string()),
                });
            }
            row.opk = Some(reading);
        }

        if let Some(raw) = cell(&cells, map.intercourse) {
            row.intercourse = parse_bool(raw);
        }

        if let Some(raw) = cell(&cells, map.notes) {
            row.notes = Some(raw.to_string());
        }

        rows.push(row);
    }

    rows.sort_by_key(|row| row.date);
    for pair in rows.windows(2) {
        if pair[0].date == pair[1].date {
            warnings.push(ImportIssue {
                line: pair[1].line,
                field: "date".to_string(),
                message: format!("duplicate date {}", pair[1].date),
                value: Some(pair[1].date.to_string()),
            });
        }
    }

    ImportResult {
        success: errors.is_empty(),
        rows,
        errors,
        warnings,
    }
}

/// Parse at most `limit` data rows for display.
pub fn preview_csv(text: &str, limit: usize) -> ImportPreview {
    let result = parse_csv(text);
    let total_rows = result.rows.len();
    let truncated = total_rows > limit;
    let mut rows = result.rows;
    rows.truncate(limit);
    ImportPreview {
        rows,
        total_rows,
        truncated,
    }
}

fn cell<'a>(cells: &[&'a str], index: Option<usize>) -> Option<&'a str> {
    let raw = cells.get(index?)?.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// Accepted date shapes, in trial order. US `M/D/YYYY` is tried before
/// European `D/M/YYYY`, so `03/04/2024` resolves as March 4.
fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = crate::dates::parse_date(raw) {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Some(date);
    }
    // Free-form fallback: other shapes seen in the wild.
    for format in ["%Y/%m/%d", "%m-%d-%Y", "%d.%m.%Y", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Map a raw cervical-fluid cell through the synonym table.
pub fn normalize_cervical_fluid(raw: &str) -> MucusReading {
    match raw.trim().to_lowercase().as_str() {
        "dry" | "none" | "nothing" => MucusReading::Dry,
        "sticky" | "tacky" => MucusReading::Sticky,
        "creamy" | "lotion" | "lotiony" | "milky" => MucusReading::Creamy,
        "watery" | "wet" => MucusReading::Watery,
        "egg-white" | "egg white" | "eggwhite" | "ewcm" | "stretchy" => MucusReading::EggWhite,
        "spotting" | "spot" => MucusReading::Spotting,
        _ => MucusReading::Unknown,
    }
}

/// Map a raw OPK cell through the synonym table.
pub fn normalize_opk(raw: &str) -> CsvOpk {
    match raw.trim().to_lowercase().as_str() {
        "negative" | "neg" | "-" | "no" | "low" => CsvOpk::Negative,
        "positive" | "pos" | "+" | "yes" | "high" => CsvOpk::Positive,
        "peak" | "peak day" => CsvOpk::Peak,
        _ => CsvOpk::Unknown,
    }
}

/// Parse a temperature cell after stripping a unit suffix.
fn parse_temperature(raw: &str) -> Option<f64> {
    let mut value = raw.trim();
    for suffix in ["°F", "°C", "°f", "°c", "F", "C", "f", "c"] {
        if let Some(stripped) = value.strip_suffix(suffix) {
            value = stripped.trim();
            break;
        }
    }
    value.parse::<f64>().ok()
}

/// Interpret a boolean cell. Empty and unrecognized values read as absent.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "x" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_iso_and_us_dates() {
        let csv = "Date,Temp\n2024-01-15,97.2\n01/16/2024,97.4\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].date, date("2024-01-15"));
        assert_eq!(result.rows[1].date, date("2024-01-16"));
    }

    #[test]
    fn test_us_rule_wins_over_european() {
        let csv = "Date\n03/04/2024\n";
        let result = parse_csv(csv);
        assert_eq!(result.rows[0].date, date("2024-03-04"));
    }

    #[test]
    fn test_european_date_when_us_fails() {
        // 25 cannot be a month, so the US rule fails and D/M/YYYY applies.
        let csv = "Date\n25/03/2024\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert_eq!(result.rows[0].date, date("2024-03-25"));
    }

    #[test]
    fn test_missing_date_column_is_fatal() {
        let result = parse_csv("Temp,CM\n97.2,dry\n");
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_bad_date_drops_row_and_continues() {
        let csv = "Date,Temp\ngarbage,97.2\n2024-01-15,97.4\n";
        let result = parse_csv(csv);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 2);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].date, date("2024-01-15"));
    }

    #[test]
    fn test_header_aliases() {
        let csv = "Log Date,BBT,CF,LH Test,BD,Memo\n2024-01-15,97.2,egg white,positive,y,note\n";
        let result = parse_csv(csv);
        assert!(result.success);
        let row = &result.rows[0];
        assert_eq!(row.temperature_f, Some(97.2));
        assert_eq!(row.cervical_fluid, Some(MucusReading::EggWhite));
        assert_eq!(row.opk, Some(CsvOpk::Positive));
        assert_eq!(row.intercourse, Some(true));
        assert_eq!(row.notes.as_deref(), Some("note"));
    }

    #[test]
    fn test_temperature_suffixes_stripped() {
        let csv = "Date,Temp\n2024-01-15,97.2°F\n2024-01-16,97.4 F\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert!(result.warnings.is_empty());
        assert_eq!(result.rows[0].temperature_f, Some(97.2));
        assert_eq!(result.rows[1].temperature_f, Some(97.4));
    }

    #[test]
    fn test_out_of_range_temperature_warns_but_keeps() {
        let csv = "Date,Temp\n2024-01-15,104.5\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.rows[0].temperature_f, Some(104.5));
    }

    #[test]
    fn test_non_numeric_temperature_warns_and_drops() {
        let csv = "Date,Temp\n2024-01-15,forgot\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.rows[0].temperature_f, None);
    }

    #[test]
    fn test_duplicate_dates_warn_but_remain() {
        let csv = "Date,CM\n2024-01-15,dry\n2024-01-15,creamy\n";
        let result = parse_csv(csv);
        assert!(result.success);
        assert_eq!(result.rows.len(), 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("duplicate date")));
    }

    #[test]
    fn test_rows_sorted_ascending() {
        let csv = "Date\n2024-01-20\n2024-01-15\n2024-01-18\n";
        let result = parse_csv(csv);
        let dates: Vec<NaiveDate> = result.rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date("2024-01-15"), date("2024-01-18"), date("2024-01-20")]
        );
    }

    #[test]
    fn test_synonyms_are_fixed_points() {
        for reading in ["dry", "sticky", "creamy", "watery", "egg-white", "spotting"] {
            let normalized = normalize_cervical_fluid(reading);
            let tag = serde_json::to_value(normalized).unwrap();
            assert_eq!(normalize_cervical_fluid(tag.as_str().unwrap()), normalized);
        }
        for reading in ["negative", "positive", "peak"] {
            let normalized = normalize_opk(reading);
            let tag = serde_json::to_value(normalized).unwrap();
            assert_eq!(normalize_opk(tag.as_str().unwrap()), normalized);
        }
    }

    #[test]
    fn test_validate_structure() {
        let validation = validate_structure("Date,Temp,CM\n");
        assert!(validation.valid);
        assert!(validation.found_columns.contains(&"date".to_string()));
        assert!(validation.found_columns.contains(&"temperature".to_string()));
        assert!(validation.missing_columns.contains(&"opk".to_string()));

        let validation = validate_structure("Temp,CM\n");
        assert!(!validation.valid);
        assert!(validation.missing_columns.contains(&"date".to_string()));
    }

    #[test]
    fn test_preview_is_bounded() {
        let csv = "Date\n2024-01-15\n2024-01-16\n2024-01-17\n";
        let preview = preview_csv(csv, 2);
        assert_eq!(preview.rows.len(), 2);
        assert_eq!(preview.total_rows, 3);
        assert!(preview.truncated);
    }
}
