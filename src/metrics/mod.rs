//! Metrics for the cleaning pipeline
//!
//! Stages emit counters through the `metrics` facade. Nothing is recorded
//! unless the caller installs a recorder; the CLI does so with
//! [`install_prometheus_recorder`] and renders the snapshot at exit.

pub mod cleaning;

pub use cleaning::CleaningMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use tracing::{info, warn};

/// Trait for phase-specific metrics collections
pub trait PhaseMetrics {
    /// Describe and pre-register every metric of the phase so it shows up
    /// in a snapshot even before the first increment.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Builds metric names following `cleaner_{phase}_{name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("cleaner_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("cleaner_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("cleaner_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

/// Installs a process-wide Prometheus recorder without any HTTP listener.
/// Returns `None` if a recorder is already installed.
pub fn install_prometheus_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_all_metrics();
            info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Registers all phases and returns the metric names, warning on duplicates.
pub fn register_all_metrics() -> Vec<&'static str> {
    let mut seen: HashMap<&'static str, &'static str> = HashMap::new();
    register_phase::<CleaningMetrics>(&mut seen);
    info!("Registered {} metrics", seen.len());
    let mut names: Vec<_> = seen.into_keys().collect();
    names.sort_unstable();
    names
}

fn register_phase<T: PhaseMetrics>(seen: &mut HashMap<&'static str, &'static str>) {
    T::register_metrics();
    for doc in T::metrics_documentation() {
        if let Some(existing) = seen.insert(doc.name, T::phase_name()) {
            warn!(
                "Metric name conflict: '{}' defined by '{}' and '{}'",
                doc.name,
                existing,
                T::phase_name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_metric_naming() {
        assert_eq!(phase_metric!(counter, "unpack", "entries"), "cleaner_unpack_entries_total");
        assert_eq!(phase_metric!(gauge, "pipeline", "rows_out"), "cleaner_pipeline_rows_out");
    }

    #[test]
    fn registry_has_no_duplicates() {
        let names = register_all_metrics();
        let docs = CleaningMetrics::metrics_documentation();
        assert_eq!(names.len(), docs.len());
    }
}
