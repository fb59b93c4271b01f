//! Cleaning phase metrics
//!
//! Counters for archive entries, rows dropped by each filter, and the
//! diagnostics the filters collect (nulls, negative values, coercion
//! failures).

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct CleaningMetrics;

impl CleaningMetrics {
    pub fn record_unpack(entries_total: usize, entries_failed: usize, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "unpack", "entries"))
            .increment(entries_total as u64);
        ::metrics::counter!(phase_metric!(counter, "unpack", "entries_failed"))
            .increment(entries_failed as u64);
        ::metrics::counter!(phase_metric!(counter, "unpack", "rows")).increment(rows as u64);
    }

    pub fn record_null_filter(nulls_seen: usize, rows_dropped: usize) {
        ::metrics::counter!(phase_metric!(counter, "nulls", "values_seen"))
            .increment(nulls_seen as u64);
        ::metrics::counter!(phase_metric!(counter, "nulls", "rows_dropped"))
            .increment(rows_dropped as u64);
    }

    pub fn record_range_filter(
        negative_values: usize,
        coercion_failures: usize,
        rows_dropped: usize,
    ) {
        ::metrics::counter!(phase_metric!(counter, "range", "negative_values"))
            .increment(negative_values as u64);
        ::metrics::counter!(phase_metric!(counter, "range", "coercion_failures"))
            .increment(coercion_failures as u64);
        ::metrics::counter!(phase_metric!(counter, "range", "rows_dropped"))
            .increment(rows_dropped as u64);
    }

    pub fn record_dedup(rows_dropped: usize) {
        ::metrics::counter!(phase_metric!(counter, "dedup", "rows_dropped"))
            .increment(rows_dropped as u64);
    }

    pub fn record_run(rows_out: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "pipeline", "runs")).increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "pipeline", "rows_out")).set(rows_out as f64);
        ::metrics::histogram!(phase_metric!(histogram, "pipeline", "duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for CleaningMetrics {
    fn register_metrics() {
        for doc in Self::metrics_documentation() {
            match doc.metric_type {
                MetricType::Counter => {
                    ::metrics::describe_counter!(doc.name, doc.help);
                    let _ = ::metrics::counter!(doc.name);
                }
                MetricType::Gauge => {
                    ::metrics::describe_gauge!(doc.name, doc.help);
                    let _ = ::metrics::gauge!(doc.name);
                }
                MetricType::Histogram => {
                    ::metrics::describe_histogram!(doc.name, doc.help);
                    let _ = ::metrics::histogram!(doc.name);
                }
            }
        }
    }

    fn phase_name() -> &'static str {
        "cleaning"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "unpack", "entries"),
                metric_type: MetricType::Counter,
                help: "Archive entries read (directories excluded)",
            },
            MetricDoc {
                name: phase_metric!(counter, "unpack", "entries_failed"),
                metric_type: MetricType::Counter,
                help: "Archive entries skipped because they could not be parsed",
            },
            MetricDoc {
                name: phase_metric!(counter, "unpack", "rows"),
                metric_type: MetricType::Counter,
                help: "Rows produced by unpacking",
            },
            MetricDoc {
                name: phase_metric!(counter, "nulls", "values_seen"),
                metric_type: MetricType::Counter,
                help: "Null values found in required columns before filtering",
            },
            MetricDoc {
                name: phase_metric!(counter, "nulls", "rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped for a null in a required column",
            },
            MetricDoc {
                name: phase_metric!(counter, "range", "negative_values"),
                metric_type: MetricType::Counter,
                help: "Negative values seen in the range column after coercion",
            },
            MetricDoc {
                name: phase_metric!(counter, "range", "coercion_failures"),
                metric_type: MetricType::Counter,
                help: "Non-null values that could not be coerced to a number",
            },
            MetricDoc {
                name: phase_metric!(counter, "range", "rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped by the range filter",
            },
            MetricDoc {
                name: phase_metric!(counter, "dedup", "rows_dropped"),
                metric_type: MetricType::Counter,
                help: "Rows dropped as fingerprint duplicates",
            },
            MetricDoc {
                name: phase_metric!(counter, "pipeline", "runs"),
                metric_type: MetricType::Counter,
                help: "Completed cleaning runs",
            },
            MetricDoc {
                name: phase_metric!(gauge, "pipeline", "rows_out"),
                metric_type: MetricType::Gauge,
                help: "Rows in the most recent clean dataset",
            },
            MetricDoc {
                name: phase_metric!(histogram, "pipeline", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a complete cleaning run",
            },
        ]
    }
}
