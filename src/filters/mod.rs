//! Row filters applied after unpacking, in pipeline order: nulls, range,
//! duplicates. Each takes a dataset by value and returns the surviving rows
//! together with a diagnostic report.

pub mod dedup;
pub mod nulls;
pub mod range;

pub use dedup::{DedupReport, Deduplicator};
pub use nulls::{ColumnNulls, NullFilter, NullReport};
pub use range::{coerce_numeric, RangeFilter, RangeReport};
