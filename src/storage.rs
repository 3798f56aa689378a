use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{PipelineError, Result};
use crate::table::{is_na, ColumnKind, Table, Value};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const EXTRA_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    std::iter::once(TIMESTAMP_FORMAT)
        .chain(EXTRA_TIMESTAMP_FORMATS)
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads a headed CSV file. Cells of `date_columns` are parsed as
/// timestamps. Every other column gets one type for all of its cells (see
/// [`ColumnKind::infer`]), so text columns come back verbatim.
pub fn load_csv(path: impl AsRef<Path>, date_columns: &[&str]) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| PipelineError::data_load(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::data_load(path, e))?
        .clone();
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<StringRecord>, _>>()
        .map_err(|e| PipelineError::data_load(path, e))?;

    // None marks a declared timestamp column
    let kinds: Vec<Option<ColumnKind>> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            (!date_columns.contains(&h))
                .then(|| ColumnKind::infer(records.iter().filter_map(|r| r.get(idx))))
        })
        .collect();

    let mut table = Table::new(headers.iter());
    for (line, record) in records.iter().enumerate() {
        let mut row = Vec::with_capacity(record.len());
        for (idx, raw) in record.iter().enumerate() {
            let value = match kinds.get(idx).copied().flatten() {
                Some(kind) => kind.parse(raw),
                None if is_na(raw) => Value::Null,
                None => {
                    let ts = parse_timestamp(raw).ok_or_else(|| {
                        PipelineError::data_load(
                            path,
                            format!(
                                "row {}: cannot parse '{}' in column '{}' as a timestamp",
                                line + 1,
                                raw,
                                &headers[idx]
                            ),
                        )
                    })?;
                    Value::Timestamp(ts)
                }
            };
            row.push(value);
        }
        table
            .push_row(row)
            .map_err(|e| PipelineError::data_load(path, e))?;
    }

    debug!("Loaded {} rows x {} columns", table.len(), table.columns().len());
    info!("Data successfully loaded from {}", path.display());
    Ok(table)
}

/// Writes `table` with a header row, creating parent directories as needed.
/// Missing values are empty cells. Timestamps use `%Y-%m-%d %H:%M:%S`, with
/// six (or nine) fractional digits when the value has a sub-second part.
/// Floats use their shortest round-trip digits with a decimal point, and
/// scientific notation with a signed exponent outside 1e-4..1e16.
pub fn save_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::save(path, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::save(path, e))?;
    writer
        .write_record(table.columns())
        .map_err(|e| PipelineError::save(path, e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| PipelineError::save(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::save(path, e))?;

    info!("Data saved to {}", path.display());
    Ok(())
}
