//! CSV loading against a feature schema.

use super::{DatasetError, RawRecord, TabularDataset, Value, MISSING_TOKENS};
use crate::preprocessing::FeatureSchema;
use ::csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Load a dataset from a CSV file with a header row.
///
/// Only the schema columns and the target are kept. Declared columns absent
/// from the header are left out of every record, so preprocessing reports them.
pub fn load_csv<P: AsRef<Path>>(
    path: P,
    schema: &FeatureSchema,
    target: &str,
) -> Result<TabularDataset, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = read_csv(BufReader::new(file), schema, target)?;
    debug!(path = %path.display(), rows = dataset.len(), "loaded csv dataset");
    Ok(dataset)
}

/// Read a dataset from any CSV source.
pub fn read_csv<R: Read>(
    reader: R,
    schema: &FeatureSchema,
    target: &str,
) -> Result<TabularDataset, DatasetError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let target_idx =
        position(target).ok_or_else(|| DatasetError::MissingTargetColumn(target.to_string()))?;
    let numeric: Vec<(&String, usize)> = schema
        .numeric()
        .iter()
        .filter_map(|name| position(name).map(|idx| (name, idx)))
        .collect();
    let categorical: Vec<(&String, usize)> = schema
        .categorical()
        .iter()
        .filter_map(|name| position(name).map(|idx| (name, idx)))
        .collect();

    let mut records = Vec::new();
    let mut targets = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let row = result?;
        let row_no = i + 1;
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        let raw_target = cell(target_idx);
        let target_value = match Value::parse_cell(raw_target) {
            Value::Number(v) if v.is_finite() => v,
            _ => {
                return Err(DatasetError::InvalidTarget {
                    row: row_no,
                    value: raw_target.to_string(),
                })
            }
        };

        let mut record = RawRecord::new();
        for &(name, idx) in &numeric {
            let value = match Value::parse_cell(cell(idx)) {
                Value::Text(text) => {
                    return Err(DatasetError::InvalidNumber {
                        row: row_no,
                        column: name.clone(),
                        value: text,
                    })
                }
                other => other,
            };
            record.insert(name.clone(), value);
        }
        for &(name, idx) in &categorical {
            let raw = cell(idx);
            let value = if MISSING_TOKENS.contains(&raw) {
                Value::Missing
            } else {
                Value::Text(raw.to_string())
            };
            record.insert(name.clone(), value);
        }

        records.push(record);
        targets.push(target_value);
    }

    if records.is_empty() {
        return Err(DatasetError::NoRows);
    }
    TabularDataset::new(records, targets)
}
