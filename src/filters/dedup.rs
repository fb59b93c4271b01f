use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::metrics::CleaningMetrics;

const STAGE: &str = "deduplication";

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    /// `false` when no dedup column was configured.
    pub applied: bool,
    pub column: Option<String>,
    pub rows_dropped: usize,
}

/// Keeps the first row for every distinct value of the key column.
/// Surviving rows stay in their original order.
pub struct Deduplicator<'a> {
    column: Option<&'a str>,
}

impl<'a> Deduplicator<'a> {
    pub fn new(column: Option<&'a str>) -> Self {
        Self { column }
    }

    #[instrument(skip_all, fields(column = ?self.column))]
    pub fn apply(&self, dataset: Dataset) -> Result<(Dataset, DedupReport)> {
        let Some(column) = self.column else {
            warn!("No key column configured to drop duplicates, nothing to do");
            return Ok((dataset, DedupReport::default()));
        };

        let values = dataset.require_column(column, STAGE)?;
        let mut seen: HashSet<String> = HashSet::with_capacity(values.len());
        // JSON text keeps "1" and 1 apart
        let keep: Vec<bool> = values.iter().map(|v| seen.insert(v.to_string())).collect();

        let before = dataset.len();
        let deduped = dataset.retain_rows(&keep);
        let rows_dropped = before - deduped.len();
        debug!("Dropped {} duplicate rows by '{}'", rows_dropped, column);
        CleaningMetrics::record_dedup(rows_dropped);

        Ok((
            deduped,
            DedupReport {
                applied: true,
                column: Some(column.to_string()),
                rows_dropped,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use crate::error::CleanerError;
    use serde_json::{json, Value};

    fn dataset(rows: Vec<Value>) -> Dataset {
        let records: Vec<Record> = rows
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Dataset::from_records(&records)
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let ds = dataset(vec![
            json!({"pk": "b", "n": 1}),
            json!({"pk": "a", "n": 2}),
            json!({"pk": "b", "n": 3}),
            json!({"pk": "c", "n": 4}),
            json!({"pk": "a", "n": 5}),
        ]);
        let (out, report) = Deduplicator::new(Some("pk")).apply(ds).unwrap();

        assert_eq!(out.column("n").unwrap(), &[json!(1), json!(2), json!(4)]);
        assert_eq!(report.rows_dropped, 2);
        assert!(report.applied);
    }

    #[test]
    fn is_idempotent() {
        let ds = dataset(vec![json!({"pk": 1}), json!({"pk": 1}), json!({"pk": "1"})]);
        let dedup = Deduplicator::new(Some("pk"));
        let (once, _) = dedup.apply(ds).unwrap();
        let (twice, report) = dedup.apply(once.clone()).unwrap();

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
        assert_eq!(report.rows_dropped, 0);
    }

    #[test]
    fn unset_column_is_noop() {
        let ds = dataset(vec![json!({"pk": 1}), json!({"pk": 1})]);
        let (out, report) = Deduplicator::new(None).apply(ds.clone()).unwrap();
        assert_eq!(out, ds);
        assert!(!report.applied);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = dataset(vec![json!({"pk": 1})]);
        let err = Deduplicator::new(Some("pk_hash")).apply(ds).unwrap_err();
        assert!(matches!(err, CleanerError::UnknownColumn { .. }));
    }
}
