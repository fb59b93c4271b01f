//! Column-oriented in-memory table of JSON-derived records.
//!
//! Every cleaning stage takes a `Dataset` by value and hands back a new one,
//! so a dataset is never shared or mutated by two stages at once. Missing
//! fields are stored as `Value::Null`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use crate::error::{CleanerError, Result};

/// One parsed JSON-lines row, keyed by field name in file order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Builds a table from records, taking the union of their fields in
    /// order of first appearance. Absent fields become nulls.
    pub fn from_records(records: &[Record]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut columns: Vec<Column> = Vec::new();

        for (row, record) in records.iter().enumerate() {
            for (key, value) in record {
                let pos = *index.entry(key.as_str()).or_insert_with(|| {
                    columns.push(Column {
                        name: key.clone(),
                        values: vec![Value::Null; records.len()],
                    });
                    columns.len() - 1
                });
                columns[pos].values[row] = value.clone();
            }
        }

        Self {
            columns,
            rows: records.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Like [`Dataset::column`], but a missing column is a configuration error
    /// attributed to `stage`.
    pub fn require_column(&self, name: &str, stage: &'static str) -> Result<&[Value]> {
        self.column(name).ok_or_else(|| CleanerError::UnknownColumn {
            column: name.to_string(),
            stage,
        })
    }

    /// Replaces the named column in place, or appends it when absent.
    ///
    /// `values` must hold exactly one value per row.
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), self.rows, "column length must match row count");
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        self
    }

    pub fn with_constant_column(self, name: &str, value: Value) -> Self {
        let values = vec![value; self.rows];
        self.with_column(name, values)
    }

    /// Keeps the rows whose mask entry is `true`, preserving their order.
    pub fn retain_rows(self, keep: &[bool]) -> Self {
        debug_assert_eq!(keep.len(), self.rows, "mask length must match row count");
        let rows = keep.iter().filter(|k| **k).count();
        let columns = self
            .columns
            .into_iter()
            .map(|column| Column {
                name: column.name,
                values: column
                    .values
                    .into_iter()
                    .zip(keep)
                    .filter_map(|(value, k)| k.then_some(value))
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }

    /// Materializes row `idx` with every column, nulls included.
    pub fn row(&self, idx: usize) -> Option<Record> {
        if idx >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.clone(), c.values[idx].clone()))
                .collect(),
        )
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.rows).filter_map(move |idx| self.row(idx))
    }

    /// Stacks datasets vertically, aligning columns by name (outer union).
    ///
    /// Returns `None` when there is nothing to stack.
    pub fn concat(parts: Vec<Dataset>) -> Option<Dataset> {
        if parts.is_empty() {
            return None;
        }

        let total: usize = parts.iter().map(|p| p.rows).sum();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut columns: Vec<Column> = Vec::new();
        let mut offset = 0;

        for part in parts {
            for column in part.columns {
                let pos = match index.get(&column.name) {
                    Some(pos) => *pos,
                    None => {
                        index.insert(column.name.clone(), columns.len());
                        columns.push(Column {
                            name: column.name.clone(),
                            values: vec![Value::Null; total],
                        });
                        columns.len() - 1
                    }
                };
                for (i, value) in column.values.into_iter().enumerate() {
                    columns[pos].values[offset + i] = value;
                }
            }
            offset += part.rows;
        }

        Some(Dataset {
            columns,
            rows: total,
        })
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.rows,
            columns: self
                .columns
                .iter()
                .map(|c| {
                    let nulls = c.null_count();
                    ColumnSummary {
                        name: c.name.clone(),
                        non_null: self.rows - nulls,
                        nulls,
                    }
                })
                .collect(),
        }
    }

    /// Writes one JSON object per row. Nulls are written out explicitly.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for record in self.records() {
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub non_null: usize,
    pub nulls: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} columns", self.rows, self.columns.len())?;
        for c in &self.columns {
            writeln!(f, "  {:<24} non-null={:<8} null={}", c.name, c.non_null, c.nulls)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn from_records_takes_union_of_fields() {
        let ds = Dataset::from_records(&[
            record(json!({"a": 1, "b": "x"})),
            record(json!({"b": "y", "c": true})),
        ]);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(ds.column("a").unwrap(), &[json!(1), Value::Null]);
        assert_eq!(ds.column("c").unwrap(), &[Value::Null, json!(true)]);
    }

    #[test]
    fn retain_rows_keeps_order() {
        let ds = Dataset::from_records(&[
            record(json!({"a": 1})),
            record(json!({"a": 2})),
            record(json!({"a": 3})),
        ]);
        let kept = ds.retain_rows(&[true, false, true]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.column("a").unwrap(), &[json!(1), json!(3)]);
    }

    #[test]
    fn concat_aligns_columns_across_parts() {
        let first = Dataset::from_records(&[record(json!({"a": 1, "b": 2}))]);
        let second = Dataset::from_records(&[record(json!({"b": 3, "c": 4}))]);

        let merged = Dataset::concat(vec![first, second]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.column_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(merged.column("a").unwrap(), &[json!(1), Value::Null]);
        assert_eq!(merged.column("b").unwrap(), &[json!(2), json!(3)]);
        assert_eq!(merged.column("c").unwrap(), &[Value::Null, json!(4)]);
    }

    #[test]
    fn concat_of_nothing_is_none() {
        assert!(Dataset::concat(Vec::new()).is_none());
    }

    #[test]
    fn with_column_replaces_existing() {
        let ds = Dataset::from_records(&[record(json!({"a": 1, "b": 2}))])
            .with_column("a", vec![json!("z")])
            .with_constant_column("src", json!("one.jsonl"));
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["a", "b", "src"]);
        assert_eq!(ds.row(0).unwrap(), record(json!({"a": "z", "b": 2, "src": "one.jsonl"})));
    }

    #[test]
    fn require_column_reports_unknown() {
        let ds = Dataset::from_records(&[record(json!({"a": 1}))]);
        let err = ds.require_column("missing", "dedup").unwrap_err();
        assert!(matches!(
            err,
            CleanerError::UnknownColumn { ref column, .. } if column == "missing"
        ));
    }

    #[test]
    fn summary_counts_nulls() {
        let ds = Dataset::from_records(&[record(json!({"a": 1})), record(json!({"a": null}))]);
        let summary = ds.summary();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns[0].nulls, 1);
        assert_eq!(summary.columns[0].non_null, 1);
    }

    #[test]
    fn writes_json_lines() {
        let ds = Dataset::from_records(&[record(json!({"a": 1})), record(json!({"b": "x"}))]);
        let mut out = Vec::new();
        ds.write_json_lines(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\"a\":1,\"b\":null}\n{\"a\":null,\"b\":\"x\"}\n");
    }
}
