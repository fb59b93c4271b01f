//! Archive cleaner: unpacks a ZIP archive of JSON-lines files into one
//! tabular dataset and runs it through null filtering, numeric range
//! filtering and fingerprint deduplication.
//!
//! ```no_run
//! use archive_cleaner::{CleaningConfig, CleaningPipeline};
//!
//! let config = CleaningConfig::load()?;
//! let outcome = CleaningPipeline::new(&config)?.run()?;
//! println!("{} clean rows", outcome.dataset.len());
//! # Ok::<(), archive_cleaner::CleanerError>(())
//! ```

pub mod archive;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod filters;
pub mod fingerprint;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::{CleaningConfig, RangeRule, ResolvedConfig};
pub use dataset::{Dataset, Record};
pub use error::{CleanerError, EntryParseError, Result};
pub use pipeline::{clean_archive, CleaningOutcome, CleaningPipeline, CleaningReport, Stage};
