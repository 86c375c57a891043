//! Timestamped JSON persistence for parsed records.

use std::path::{Path, PathBuf};

use blood_report_models::ClinicalRecord;
use chrono::{DateTime, TimeZone};

use crate::ReportError;

/// Builds the file name a record saved at `timestamp` is written to,
/// e.g. `blood_report_20240115_143000.json`.
#[must_use]
pub fn report_filename<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("blood_report_{}.json", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Writes `record` as indented JSON into `dir`, creating the directory if
/// needed, and returns the path of the written file.
///
/// A record saved within the same second as an earlier one replaces it.
///
/// # Errors
///
/// * [`ReportError::Io`] if the directory or file cannot be written
/// * [`ReportError::Json`] if the record fails to serialize
pub fn save_record<Tz: TimeZone>(
    dir: &Path,
    record: &ClinicalRecord,
    timestamp: &DateTime<Tz>,
) -> Result<PathBuf, ReportError>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir)?;

    let path = dir.join(report_filename(timestamp));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;

    log::info!("Saved parsed report to {}", path.display());

    Ok(path)
}
