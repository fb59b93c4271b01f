//! The cleaning pipeline: unpack, drop nulls, filter range, deduplicate.
//!
//! The stage order is fixed. Stages only become no-ops through their own
//! configuration fallbacks, and any stage error ends the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::archive::{ArchiveUnpacker, UnpackReport};
use crate::config::{CleaningConfig, ResolvedConfig};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filters::{DedupReport, Deduplicator, NullFilter, NullReport, RangeFilter, RangeReport};
use crate::metrics::CleaningMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Unpack,
    DropNulls,
    FilterRange,
    Deduplicate,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Unpack,
        Stage::DropNulls,
        Stage::FilterRange,
        Stage::Deduplicate,
        Stage::Done,
    ];

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Unpack => Some(Stage::DropNulls),
            Stage::DropNulls => Some(Stage::FilterRange),
            Stage::FilterRange => Some(Stage::Deduplicate),
            Stage::Deduplicate => Some(Stage::Done),
            Stage::Done => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unpack => "UNZIPPING OF DELIVERY",
            Stage::DropNulls => "DROP NULLS",
            Stage::FilterRange => "DROP OUT OF RANGE",
            Stage::Deduplicate => "DROP DUPLICATES",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Diagnostics of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub archive_path: PathBuf,
    pub unpack: UnpackReport,
    pub nulls: NullReport,
    pub range: RangeReport,
    pub dedup: DedupReport,
    pub rows_out: usize,
}

#[derive(Debug)]
pub struct CleaningOutcome {
    pub dataset: Dataset,
    pub report: CleaningReport,
}

pub struct CleaningPipeline {
    config: ResolvedConfig,
}

impl CleaningPipeline {
    /// Resolves `config` once; every defaulted option is logged here.
    pub fn new(config: &CleaningConfig) -> Result<Self> {
        let config = config.resolve()?;
        Ok(Self { config })
    }

    /// Reads `path` instead of the configured archive.
    pub fn with_archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.archive_path = path.into();
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    #[instrument(skip(self), fields(archive = %self.config.archive_path.display()))]
    pub fn run(&self) -> Result<CleaningOutcome> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let cfg = &self.config;
        info!("Using meta data archive '{}'", cfg.archive_path.display());

        let mut stage = Stage::Unpack;

        enter(stage);
        let unpacked = ArchiveUnpacker::new(&cfg.fingerprint_column, &cfg.provenance_column)
            .unpack(&cfg.archive_path)?;
        debug!("Unpacked dataset:\n{}", unpacked.dataset.summary());
        stage = advance(stage);

        let (dataset, nulls) = NullFilter::new(&cfg.required_columns).apply(unpacked.dataset)?;
        stage = advance(stage);

        let (dataset, range) = RangeFilter::new(&cfg.range).apply(dataset)?;
        stage = advance(stage);

        let (dataset, dedup) = Deduplicator::new(cfg.dedup_column.as_deref()).apply(dataset)?;
        stage = advance(stage);
        debug_assert_eq!(stage, Stage::Done);

        let rows_out = dataset.len();
        CleaningMetrics::record_run(rows_out, timer.elapsed().as_secs_f64());
        if unpacked.report.entries_failed > 0 {
            warn!(
                "{} of {} archive entries were skipped",
                unpacked.report.entries_failed, unpacked.report.entries_total
            );
        }
        info!(
            "Cleaning finished: {} rows in, {} rows out",
            unpacked.report.rows, rows_out
        );
        debug!("Clean dataset:\n{}", dataset.summary());

        Ok(CleaningOutcome {
            dataset,
            report: CleaningReport {
                started_at,
                finished_at: Utc::now(),
                archive_path: cfg.archive_path.clone(),
                unpack: unpacked.report,
                nulls,
                range,
                dedup,
                rows_out,
            },
        })
    }
}

/// Convenience for callers that only need the clean dataset.
pub fn clean_archive(config: &CleaningConfig, archive: &Path) -> Result<Dataset> {
    Ok(CleaningPipeline::new(config)?
        .with_archive_path(archive)
        .run()?
        .dataset)
}

fn enter(stage: Stage) {
    debug!("STEP: start of {}", stage);
}

fn advance(stage: Stage) -> Stage {
    debug!("STEP: end of {}", stage);
    let next = stage.next().unwrap_or(Stage::Done);
    if next != Stage::Done {
        enter(next);
    }
    next
}
