//! Tabular export of a series
//!
//! Comma-separated, header `date,value`, one row per observation in series
//! order. Dates are ISO-8601; values use Rust's shortest round-trip float
//! formatting so a parse of the export reproduces the exact values.

use crate::error::AnalystError;
use crate::models::{Observation, SeriesRecord};
use crate::Result;
use chrono::NaiveDate;
use std::io::Write;

pub const CSV_HEADER: &str = "date,value";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn write_csv<W: Write>(observations: &[Observation], mut writer: W) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;

    for obs in observations {
        writeln!(writer, "{},{}", obs.date.format("%Y-%m-%d"), obs.value)?;
    }

    Ok(())
}

pub fn to_csv(record: &SeriesRecord) -> Result<String> {
    let mut buf = Vec::with_capacity(record.observations.len() * 18 + CSV_HEADER.len() + 1);
    write_csv(&record.observations, &mut buf)?;
    String::from_utf8(buf).map_err(|e| AnalystError::IoError(std::io::Error::other(e)))
}

/// Suggested download name, e.g. `MORTGAGE30US.csv`.
pub fn file_name(record: &SeriesRecord) -> String {
    format!("{}.csv", record.series_id)
}

/// Parse an export back into observations.
pub fn parse_csv(input: &str) -> Result<Vec<Observation>> {
    let mut lines = input.lines();

    match lines.next().map(str::trim) {
        Some(CSV_HEADER) => {}
        other => {
            return Err(AnalystError::InvalidQuery(format!(
                "unexpected CSV header: {:?}",
                other
            )))
        }
    }

    lines
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| -> Result<Observation> {
            let row = i + 2;
            let (date, value) = line.trim().split_once(',').ok_or_else(|| {
                AnalystError::InvalidQuery(format!("row {} has no value column", row))
            })?;
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| AnalystError::InvalidQuery(format!("row {} has an invalid date", row)))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| AnalystError::InvalidQuery(format!("row {} has an invalid value", row)))?;
            Ok(Observation { date, value })
        })
        .collect()
}
