use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use super::Split;

/// Outcome of the most recent download attempt for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// One persisted download outcome, keyed by record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub split: Split,
    pub status: Status,
    pub filename: String,
    pub error: String,
}

/// Durable per-record download log backed by a CSV file with the fixed
/// column schema `id, split, status, filename, error`.
///
/// Every mutation rewrites the entire file, so a kill mid-run never leaves
/// a half-written entry. Entries are appended and updated, never deleted.
/// Id uniqueness is not enforced; `update` touches every matching row.
pub struct DownloadLog {
    path: PathBuf,
    entries: Vec<LogEntry>,
}

impl DownloadLog {
    /// Reads the log at `path`, or starts an empty one if the file does not
    /// exist yet. An existing but unparsable file is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = Vec::new();
        if path.exists() {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("failed to open download log {}", path.display()))?;
            for row in reader.deserialize() {
                let entry: LogEntry = row
                    .with_context(|| format!("corrupt download log {}", path.display()))?;
                entries.push(entry);
            }
        }
        Ok(Self { path, entries })
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Ids that already have an entry, regardless of status.
    pub fn processed_ids(&self) -> HashSet<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    pub fn failed_entries(&self) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == Status::Failed)
            .cloned()
            .collect()
    }

    /// Appends one entry and persists the whole log.
    pub fn append(&mut self, entry: LogEntry) -> Result<()> {
        self.entries.push(entry);
        self.save()
    }

    /// Rewrites status and error on every entry matching `id`, then
    /// persists. Leaves the file untouched when no entry matches.
    pub fn update(&mut self, id: &str, status: Status, error: &str) -> Result<()> {
        let mut matched = false;
        for entry in self.entries.iter_mut().filter(|entry| entry.id == id) {
            entry.status = status;
            entry.error = error.to_string();
            matched = true;
        }
        if matched {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("failed to write download log {}", self.path.display()))?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush download log {}", self.path.display()))
    }
}
