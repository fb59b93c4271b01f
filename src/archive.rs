//! Archive unpacking: every file entry of a ZIP archive is read as
//! JSON-lines text and turned into one dataset.
//!
//! Failures are isolated per entry. A bad line anywhere in an entry drops
//! the whole entry, the failure is counted, and the next entry is read.
//! Only when no entry survives does unpacking itself fail.

use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use zip::ZipArchive;

use crate::dataset::{Dataset, Record};
use crate::error::{CleanerError, EntryParseError, Result};
use crate::fingerprint::fingerprint_record;
use crate::metrics::CleaningMetrics;

/// Result of reading a single archive entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Parsed { entry: String, dataset: Dataset },
    Failed { entry: String, error: EntryParseError },
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryFailure {
    pub entry: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UnpackReport {
    pub entries_total: usize,
    pub entries_failed: usize,
    pub rows: usize,
    pub failures: Vec<EntryFailure>,
}

#[derive(Debug)]
pub struct Unpacked {
    pub dataset: Dataset,
    pub report: UnpackReport,
}

pub struct ArchiveUnpacker<'a> {
    fingerprint_column: &'a str,
    provenance_column: &'a str,
}

impl<'a> ArchiveUnpacker<'a> {
    pub fn new(fingerprint_column: &'a str, provenance_column: &'a str) -> Self {
        Self {
            fingerprint_column,
            provenance_column,
        }
    }

    /// Reads every entry of the archive at `path` into one dataset.
    ///
    /// The archive handle lives only for the duration of this call.
    #[instrument(skip(self), fields(archive = %path.display()))]
    pub fn unpack(&self, path: &Path) -> Result<Unpacked> {
        if !path.exists() {
            error!("Meta data archive '{}' not found.", path.display());
            return Err(CleanerError::ArchiveNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|source| {
            error!("Meta data archive '{}' could not be opened: {}", path.display(), source);
            CleanerError::ArchiveOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut archive = ZipArchive::new(file).map_err(|source| CleanerError::Archive {
            path: path.to_path_buf(),
            source,
        })?;

        let mut report = UnpackReport::default();
        let mut parts = Vec::new();

        for idx in 0..archive.len() {
            let outcome = match archive.by_index(idx) {
                Ok(entry) if entry.is_dir() => {
                    debug!("Skipping directory entry '{}'", entry.name());
                    continue;
                }
                Ok(entry) => {
                    let name = entry.name().to_string();
                    self.read_entry(name, entry)
                }
                Err(e) => EntryOutcome::Failed {
                    entry: format!("#{}", idx),
                    error: EntryParseError::Open(e),
                },
            };

            report.entries_total += 1;
            match outcome {
                EntryOutcome::Parsed { entry, dataset } => {
                    debug!("Read {} records from entry '{}'", dataset.len(), entry);
                    report.rows += dataset.len();
                    parts.push(dataset);
                }
                EntryOutcome::Failed { entry, error } => {
                    warn!("Error reading file: {}, Error: {}", entry, error);
                    report.entries_failed += 1;
                    report.failures.push(EntryFailure {
                        entry,
                        reason: error.to_string(),
                    });
                }
            }
        }
        drop(archive);

        info!(
            "Count of files total: {}, files with errors total: {}",
            report.entries_total, report.entries_failed
        );
        CleaningMetrics::record_unpack(report.entries_total, report.entries_failed, report.rows);

        let dataset = Dataset::concat(parts).ok_or_else(|| CleanerError::EmptyDataset {
            path: path.to_path_buf(),
            entries_total: report.entries_total,
        })?;

        Ok(Unpacked { dataset, report })
    }

    /// Parses one entry's bytes. Never fails: errors become
    /// [`EntryOutcome::Failed`].
    pub fn read_entry<R: Read>(&self, entry: String, reader: R) -> EntryOutcome {
        match self.parse_entry(&entry, BufReader::new(reader)) {
            Ok(dataset) => EntryOutcome::Parsed { entry, dataset },
            Err(error) => EntryOutcome::Failed { entry, error },
        }
    }

    /// Parses JSON-lines text into a dataset, fingerprinting each record
    /// before the provenance column is attached. Blank lines are skipped.
    pub fn parse_entry<R: BufRead>(
        &self,
        entry: &str,
        reader: R,
    ) -> std::result::Result<Dataset, EntryParseError> {
        let mut records: Vec<Record> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|source| EntryParseError::Decode {
                line: line_no,
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).map_err(|source| {
                EntryParseError::Json {
                    line: line_no,
                    source,
                }
            })?;
            match value {
                Value::Object(record) => records.push(record),
                _ => return Err(EntryParseError::NotAnObject { line: line_no }),
            }
        }

        if records.is_empty() {
            return Err(EntryParseError::NoRecords);
        }

        let fingerprints = records
            .iter()
            .map(|r| Value::String(fingerprint_record(r)))
            .collect();

        let dataset = Dataset::from_records(&records);
        if dataset.has_column(self.fingerprint_column)
            || dataset.has_column(self.provenance_column)
        {
            warn!(
                "Entry '{}' already has a '{}' or '{}' field, it will be overwritten",
                entry, self.fingerprint_column, self.provenance_column
            );
        }

        Ok(dataset
            .with_column(self.fingerprint_column, fingerprints)
            .with_constant_column(self.provenance_column, Value::String(entry.to_string())))
    }
}
