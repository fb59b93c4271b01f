use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::metrics::CleaningMetrics;

const STAGE: &str = "null filter";

#[derive(Debug, Clone, Serialize)]
pub struct ColumnNulls {
    pub column: String,
    pub nulls: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NullReport {
    /// `false` when no required columns were configured.
    pub applied: bool,
    /// Nulls per required column, counted before any row is dropped.
    pub null_counts: Vec<ColumnNulls>,
    pub rows_dropped: usize,
}

/// Drops rows that have a null in any of the required columns.
pub struct NullFilter<'a> {
    required: &'a [String],
}

impl<'a> NullFilter<'a> {
    pub fn new(required: &'a [String]) -> Self {
        Self { required }
    }

    #[instrument(skip_all, fields(required = ?self.required))]
    pub fn apply(&self, dataset: Dataset) -> Result<(Dataset, NullReport)> {
        if self.required.is_empty() {
            warn!("No column list to drop nulls configured, nothing to do");
            return Ok((dataset, NullReport::default()));
        }

        let mut keep = vec![true; dataset.len()];
        let mut null_counts = Vec::with_capacity(self.required.len());

        for column in self.required {
            let values = dataset.require_column(column, STAGE)?;
            let mut nulls = 0;
            for (row, value) in values.iter().enumerate() {
                if value.is_null() {
                    nulls += 1;
                    keep[row] = false;
                }
            }
            null_counts.push(ColumnNulls {
                column: column.clone(),
                nulls,
            });
        }

        let before = dataset.len();
        let filtered = dataset.retain_rows(&keep);
        let report = NullReport {
            applied: true,
            rows_dropped: before - filtered.len(),
            null_counts,
        };

        debug!("Count nulls in {:?}: {:?}", self.required, report.null_counts);
        CleaningMetrics::record_null_filter(
            report.null_counts.iter().map(|c| c.nulls).sum(),
            report.rows_dropped,
        );
        Ok((filtered, report))
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
    fn no_required_columns_is_noop() {
        let ds = dataset(vec![json!({"a": null}), json!({"a": 1})]);
        let (out, report) = NullFilter::new(&[]).apply(ds.clone()).unwrap();
        assert_eq!(out, ds);
        assert!(!report.applied);
        assert_eq!(report.rows_dropped, 0);
    }

    #[test]
    fn drops_rows_with_nulls_and_counts_per_column() {
        let ds = dataset(vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": null, "b": "y"}),
            json!({"a": 3}),
            json!({"a": null}),
        ]);
        let required = vec!["a".to_string(), "b".to_string()];
        let (out, report) = NullFilter::new(&required).apply(ds).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out.column("a").unwrap(), &[json!(1)]);
        assert!(report.applied);
        assert_eq!(report.rows_dropped, 3);
        assert_eq!(report.null_counts[0].nulls, 2);
        assert_eq!(report.null_counts[1].nulls, 2);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = dataset(vec![json!({"a": 1})]);
        let required = vec!["vin".to_string()];
        let err = NullFilter::new(&required).apply(ds).unwrap_err();
        assert!(matches!(err, CleanerError::UnknownColumn { ref column, .. } if column == "vin"));
    }
}
