use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a cleaning run. Nothing here is retried.
#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Meta data archive '{}' not found", .path.display())]
    ArchiveNotFound { path: PathBuf },

    #[error("Failed to open archive '{}': {source}", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read archive '{}': {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(
        "No entry of archive '{}' could be parsed ({entries_total} entries seen); nothing to build a dataset from",
        .path.display()
    )]
    EmptyDataset { path: PathBuf, entries_total: usize },

    #[error("Column '{column}' configured for {stage} does not exist in the dataset")]
    UnknownColumn { column: String, stage: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CleanerError>;

/// Why a single archive entry was skipped. Contained inside the unpacker.
#[derive(Error, Debug)]
pub enum EntryParseError {
    #[error("failed to open entry: {0}")]
    Open(#[from] zip::result::ZipError),

    #[error("failed to decode line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line} is not a JSON object")]
    NotAnObject { line: usize },

    #[error("entry contains no records")]
    NoRecords,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_not_found_names_the_path() {
        let err = CleanerError::ArchiveNotFound {
            path: PathBuf::from("NOT_SET"),
        };
        assert_eq!(err.to_string(), "Meta data archive 'NOT_SET' not found");
    }

    #[test]
    fn unopenable_archive_names_the_path() {
        let err = CleanerError::ArchiveOpen {
            path: PathBuf::from("data/meta_data_archive.zip"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to open archive 'data/meta_data_archive.zip': "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn unknown_column_names_column_and_stage() {
        let err = CleanerError::UnknownColumn {
            column: "vin".to_string(),
            stage: "null filter",
        };
        let msg = err.to_string();
        assert!(msg.contains("'vin'"));
        assert!(msg.contains("null filter"));
    }
}
