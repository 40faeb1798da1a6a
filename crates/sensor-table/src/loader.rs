//! CSV Loader

use crate::{SensorTable, TableError};
use chrono::{DateTime, TimeZone, Utc};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Accepted names for the timestamp column
const TIMESTAMP_HEADERS: [&str; 2] = ["timestamp", "epoch (ms)"];

/// Load a sensor table from a CSV file
pub fn read_csv(path: impl AsRef<Path>) -> Result<SensorTable, TableError> {
    let path = path.as_ref();
    info!("Loading sensor table from {}", path.display());

    let file = File::open(path)
        .map_err(|e| TableError::Io(format!("{}: {}", path.display(), e)))?;
    read_csv_from(file)
}

/// Load a sensor table from any CSV reader.
///
/// The header must contain a timestamp column (`timestamp` or `epoch (ms)`)
/// and the `set`, `category`, `label` and `participant` columns. Every other
/// column is numeric, in file order; empty cells become missing values.
pub fn read_csv_from<R: Read>(reader: R) -> Result<SensorTable, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find = |name: &str| -> Result<usize, TableError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    };

    let timestamp_idx = headers
        .iter()
        .position(|h| TIMESTAMP_HEADERS.contains(&h))
        .ok_or_else(|| TableError::MissingColumn("timestamp".to_string()))?;
    let set_idx = find("set")?;
    let category_idx = find("category")?;
    let label_idx = find("label")?;
    let participant_idx = find("participant")?;

    let categorical = [timestamp_idx, set_idx, category_idx, label_idx, participant_idx];
    let numeric: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !categorical.contains(i))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut index = Vec::new();
    let mut sets = Vec::new();
    let mut categories = Vec::new();
    let mut labels = Vec::new();
    let mut participants = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); numeric.len()];

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        // header occupies line 1
        let line = row + 2;

        index.push(parse_timestamp(&record[timestamp_idx], line, &headers[timestamp_idx])?);
        sets.push(parse_set(&record[set_idx], line)?);
        categories.push(record[category_idx].to_string());
        labels.push(record[label_idx].to_string());
        participants.push(record[participant_idx].to_string());

        for (slot, (col_idx, name)) in values.iter_mut().zip(numeric.iter()) {
            slot.push(parse_numeric(&record[*col_idx], line, name)?);
        }
    }

    debug!(
        "Parsed {} rows with {} numeric columns",
        index.len(),
        numeric.len()
    );

    let mut table = SensorTable::new(index, sets, categories, labels, participants)?;
    for ((_, name), column) in numeric.into_iter().zip(values) {
        table.insert_column(name, column)?;
    }

    info!("Loaded {} samples", table.len());
    Ok(table)
}

fn parse_timestamp(raw: &str, line: usize, column: &str) -> Result<DateTime<Utc>, TableError> {
    let invalid = || TableError::InvalidValue {
        line,
        column: column.to_string(),
        value: raw.to_string(),
    };

    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

fn parse_set(raw: &str, line: usize) -> Result<u32, TableError> {
    if let Ok(set) = raw.parse::<u32>() {
        return Ok(set);
    }

    // Sets exported from float columns look like "12.0"
    match raw.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(TableError::InvalidValue {
            line,
            column: "set".to_string(),
            value: raw.to_string(),
        }),
    }
}

fn parse_numeric(raw: &str, line: usize, column: &str) -> Result<f64, TableError> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| TableError::InvalidValue {
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
