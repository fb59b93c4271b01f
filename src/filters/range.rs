use serde::Serialize;
use serde_json::{Number, Value};
use tracing::{debug, instrument};

use crate::config::RangeRule;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::metrics::CleaningMetrics;

const STAGE: &str = "range filter";

#[derive(Debug, Clone, Default, Serialize)]
pub struct RangeReport {
    pub column: String,
    /// Values below zero after coercion, whatever the configured bounds.
    pub negative_values: usize,
    pub below_min: usize,
    pub above_max: usize,
    /// Null before coercion.
    pub missing: usize,
    /// Non-null values that did not coerce to a finite number.
    pub coercion_failures: usize,
    pub rows_dropped: usize,
}

/// Coerces a column to numbers and keeps rows whose value lies within
/// the rule's inclusive bounds. Rows whose value is null or cannot be
/// coerced are always dropped.
pub struct RangeFilter<'a> {
    rule: &'a RangeRule,
}

/// Numeric reading of a JSON value. Numbers pass through, strings are
/// parsed after trimming, booleans read as 1/0. Anything else, and any
/// non-finite result, is `None`.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }?;
    n.is_finite().then_some(n)
}

/// JSON number for a coerced value, keeping integers integral.
fn numeric_value(original: &Value, n: f64) -> Value {
    if original.is_number() {
        return original.clone();
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

impl<'a> RangeFilter<'a> {
    pub fn new(rule: &'a RangeRule) -> Self {
        Self { rule }
    }

    #[instrument(skip_all, fields(column = %self.rule.column))]
    pub fn apply(&self, dataset: Dataset) -> Result<(Dataset, RangeReport)> {
        let rule = self.rule;
        let values = dataset.require_column(&rule.column, STAGE)?;

        let mut report = RangeReport {
            column: rule.column.clone(),
            ..Default::default()
        };
        let mut keep = Vec::with_capacity(values.len());
        let mut coerced = Vec::with_capacity(if rule.coerce_in_place { values.len() } else { 0 });

        for value in values {
            let n = coerce_numeric(value);
            match n {
                None if value.is_null() => report.missing += 1,
                None => report.coercion_failures += 1,
                Some(n) if n < 0.0 => report.negative_values += 1,
                Some(_) => {}
            }

            let in_range = match n {
                Some(n) => {
                    let above_min = rule.min.map_or(true, |min| n >= min);
                    let below_max = rule.max.map_or(true, |max| n <= max);
                    if !above_min {
                        report.below_min += 1;
                    }
                    if !below_max {
                        report.above_max += 1;
                    }
                    above_min && below_max
                }
                None => false,
            };
            keep.push(in_range);

            if rule.coerce_in_place {
                coerced.push(n.map_or(Value::Null, |n| numeric_value(value, n)));
            }
        }

        if report.negative_values > 0 {
            debug!(
                "Total count values less than 0 in '{}' column: {}",
                rule.column, report.negative_values
            );
        }
        if report.coercion_failures > 0 {
            debug!(
                "{} values in '{}' could not be read as numbers and count as missing",
                report.coercion_failures, rule.column
            );
        }

        let dataset = if rule.coerce_in_place {
            dataset.with_column(&rule.column, coerced)
        } else {
            dataset
        };
        let before = dataset.len();
        let filtered = dataset.retain_rows(&keep);
        report.rows_dropped = before - filtered.len();

        CleaningMetrics::record_range_filter(
            report.negative_values,
            report.coercion_failures,
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
    use serde_json::json;

    fn dataset(rows: Vec<Value>) -> Dataset {
        let records: Vec<Record> = rows
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Dataset::from_records(&records)
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_numeric(&json!(12)), Some(12.0));
        assert_eq!(coerce_numeric(&json!(" 10.5 ")), Some(10.5));
        assert_eq!(coerce_numeric(&json!("-5")), Some(-5.0));
        assert_eq!(coerce_numeric(&json!(true)), Some(1.0));
        assert_eq!(coerce_numeric(&json!("ten")), None);
        assert_eq!(coerce_numeric(&json!("")), None);
        assert_eq!(coerce_numeric(&json!("NaN")), None);
        assert_eq!(coerce_numeric(&json!("inf")), None);
        assert_eq!(coerce_numeric(&json!([1])), None);
        assert_eq!(coerce_numeric(&Value::Null), None);
    }

    #[test]
    fn drops_negative_missing_and_unparseable() {
        let ds = dataset(vec![
            json!({"id": 1, "total_driven_km": "10"}),
            json!({"id": 2, "total_driven_km": "-5"}),
            json!({"id": 3, "total_driven_km": "n/a"}),
            json!({"id": 4}),
            json!({"id": 5, "total_driven_km": 0}),
        ]);
        let rule = RangeRule::default();
        let (out, report) = RangeFilter::new(&rule).apply(ds).unwrap();

        assert_eq!(out.column("id").unwrap(), &[json!(1), json!(5)]);
        // values are left untouched by default
        assert_eq!(out.column("total_driven_km").unwrap(), &[json!("10"), json!(0)]);
        assert_eq!(report.negative_values, 1);
        assert_eq!(report.below_min, 1);
        assert_eq!(report.coercion_failures, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(report.rows_dropped, 3);
    }

    #[test]
    fn upper_bound_and_in_place_coercion() {
        let ds = dataset(vec![
            json!({"km": "100"}),
            json!({"km": "2.5"}),
            json!({"km": 5000}),
        ]);
        let rule = RangeRule {
            column: "km".to_string(),
            min: None,
            max: Some(1000.0),
            coerce_in_place: true,
        };
        let (out, report) = RangeFilter::new(&rule).apply(ds).unwrap();

        assert_eq!(out.column("km").unwrap(), &[json!(100), json!(2.5)]);
        assert_eq!(report.above_max, 1);
        assert_eq!(report.below_min, 0);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let ds = dataset(vec![json!({"a": 1})]);
        let err = RangeFilter::new(&RangeRule::default()).apply(ds).unwrap_err();
        assert!(matches!(
            err,
            CleanerError::UnknownColumn { ref column, .. } if column == "total_driven_km"
        ));
    }
}
