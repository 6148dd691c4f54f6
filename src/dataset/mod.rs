//! Click dataset loading.
//!
//! Reads a delimited export of the experiment spreadsheet and turns each
//! row into a [`ClickRecord`]. Rows with a missing device or an unusable
//! click count are skipped and reported as warnings.

use crate::error::DatasetError;
use crate::models::{ClickRecord, RowWarning};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Settings for reading the dataset.
#[derive(Debug, Clone)]
pub struct DatasetSettings {
    /// Header of the device category column
    pub device_column: String,
    /// Header of the click count column
    pub clicks_column: String,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            device_column: "Device".to_string(),
            clicks_column: "Clicks".to_string(),
            delimiter: b',',
        }
    }
}

impl From<&crate::config::DatasetConfig> for DatasetSettings {
    fn from(config: &crate::config::DatasetConfig) -> Self {
        Self {
            device_column: config.device_column.clone(),
            clicks_column: config.clicks_column.clone(),
            delimiter: config.delimiter_byte(),
        }
    }
}

/// Records read from a dataset, plus import bookkeeping.
#[derive(Debug, Default)]
pub struct DatasetOutput {
    pub records: Vec<ClickRecord>,
    pub warnings: Vec<RowWarning>,
    pub total_rows_processed: usize,
    pub skipped_rows: usize,
    pub detected_columns: Vec<String>,
}

/// Load click records from a file.
pub fn load_click_records(
    path: &Path,
    settings: &DatasetSettings,
) -> Result<DatasetOutput, DatasetError> {
    debug!("Reading dataset: {}", path.display());
    let file = std::fs::File::open(path)?;
    read_click_records(std::io::BufReader::new(file), settings)
}

/// Read click records from any reader.
pub fn read_click_records<R: Read>(
    reader: R,
    settings: &DatasetSettings,
) -> Result<DatasetOutput, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(settings.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetError::EmptyFile);
    }

    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let missing: Vec<String> = [&settings.device_column, &settings.clicks_column]
        .into_iter()
        .filter(|name| !columns.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns(missing));
    }

    let device_idx = columns[settings.device_column.as_str()];
    let clicks_idx = columns[settings.clicks_column.as_str()];

    let mut output = DatasetOutput {
        detected_columns: headers.iter().map(String::from).collect(),
        ..Default::default()
    };

    for result in rdr.records() {
        output.total_rows_processed += 1;
        // +1 for the header row
        let line = output.total_rows_processed + 1;

        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|record| parse_row(&record, device_idx, clicks_idx, settings));

        match parsed {
            Ok(record) => output.records.push(record),
            Err(message) => {
                debug!("Skipping line {}: {}", line, message);
                output.warnings.push(RowWarning { line, message });
                output.skipped_rows += 1;
            }
        }
    }

    if output.skipped_rows > 0 {
        warn!(
            "Skipped {} of {} dataset rows",
            output.skipped_rows, output.total_rows_processed
        );
    }

    Ok(output)
}

fn parse_row(
    record: &csv::StringRecord,
    device_idx: usize,
    clicks_idx: usize,
    settings: &DatasetSettings,
) -> Result<ClickRecord, String> {
    let device = record.get(device_idx).unwrap_or("");
    if device.trim().is_empty() {
        return Err(format!("missing {} value", settings.device_column));
    }

    let raw_clicks = record.get(clicks_idx).unwrap_or("");
    let clicks = parse_clicks(raw_clicks).ok_or_else(|| {
        if raw_clicks.trim().is_empty() {
            format!("missing {} value", settings.clicks_column)
        } else {
            format!("invalid {} value '{}'", settings.clicks_column, raw_clicks)
        }
    })?;

    Ok(ClickRecord::new(device, clicks))
}

/// Parse a non-negative integer count. Spreadsheet exports often write
/// whole numbers as `12.0`, so integral floats are accepted too.
fn parse_clicks(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(n);
    }

    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}
