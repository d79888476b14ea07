use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One geocoded row from a split's source table.
///
/// `id` keeps the raw CSV text, which is the string-normalized form used as
/// the key everywhere else. Columns beyond the required three are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub id: String,
    pub lat: f64,
    pub long: f64,
}

const REQUIRED_COLUMNS: [&str; 3] = ["id", "lat", "long"];

/// Loads every record from the table at `path`, in table order.
pub fn load(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open source table {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?;
    validate_headers(headers)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: Record =
            row.with_context(|| format!("invalid row in source table {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Finds the record with the given id, re-reading the table from disk.
pub fn find_by_id(path: &Path, id: &str) -> Result<Option<Record>> {
    Ok(load(path)?.into_iter().find(|record| record.id == id))
}

fn validate_headers(headers: &csv::StringRecord) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            bail!("source table must have columns: id, lat, long");
        }
    }
    Ok(())
}
