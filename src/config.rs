use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{
    self, DEFAULT_ARCHIVE_PATH, DEFAULT_CONFIG_DIR, DEFAULT_FINGERPRINT_COLUMN,
    DEFAULT_PROVENANCE_COLUMN, DEFAULT_RANGE_COLUMN, DEFAULT_RANGE_MIN, DEFAULT_STAGE,
    ENV_ARCHIVE_PATH, ENV_CONFIG_DIR, ENV_DEDUP_COLUMN, ENV_FINGERPRINT_COLUMN,
    ENV_PROVENANCE_COLUMN, ENV_REQUIRED_COLUMNS, ENV_STAGE,
};
use crate::error::{CleanerError, Result};

/// Numeric range a column must satisfy. Bounds are inclusive and optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeRule {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Write the coerced numbers back into the column instead of only
    /// using them for the range test.
    pub coerce_in_place: bool,
}

impl Default for RangeRule {
    fn default() -> Self {
        Self {
            column: DEFAULT_RANGE_COLUMN.to_string(),
            min: Some(DEFAULT_RANGE_MIN),
            max: None,
            coerce_in_place: false,
        }
    }
}

/// Cleaning options as read from a stage file and the environment.
/// Anything left `None` is defaulted by [`CleaningConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleaningConfig {
    pub archive_path: Option<PathBuf>,
    pub fingerprint_column: Option<String>,
    pub provenance_column: Option<String>,
    pub required_columns: Option<Vec<String>>,
    pub dedup_column: Option<String>,
    pub range: Option<RangeRule>,
}

/// Fully defaulted and validated options handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub archive_path: PathBuf,
    pub fingerprint_column: String,
    pub provenance_column: String,
    /// Empty means the null filter is a no-op.
    pub required_columns: Vec<String>,
    /// `None` means deduplication is a no-op.
    pub dedup_column: Option<String>,
    pub range: RangeRule,
}

/// Deployment stage from `STAGE`, e.g. `LOCAL`, `DEV`, `PROD`.
pub fn current_stage() -> String {
    env::var(ENV_STAGE).unwrap_or_else(|_| DEFAULT_STAGE.to_string())
}

impl CleaningConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CleanerError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `config_<stage>.toml` from `dir`. A missing stage file leaves
    /// every option unset.
    pub fn for_stage(stage: &str, dir: &Path) -> Result<Self> {
        let path = dir.join(constants::config_file_for_stage(stage));
        if !path.exists() {
            warn!(
                "No config file for stage '{}' at '{}', every option falls back to its default",
                stage,
                path.display()
            );
            return Ok(Self::default());
        }
        info!("Loading config for stage '{}' from '{}'", stage, path.display());
        Self::from_file(&path)
    }

    /// Stage file selected by `STAGE` under `CLEANER_CONFIG_DIR`, with
    /// `CLEANER_*` environment overrides applied on top.
    pub fn load() -> Result<Self> {
        let dir = env::var(ENV_CONFIG_DIR).unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
        let config = Self::for_stage(&current_stage(), Path::new(&dir))?;
        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production). Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_ARCHIVE_PATH) {
            self.archive_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(column) = get(ENV_FINGERPRINT_COLUMN) {
            self.fingerprint_column = Some(column.trim().to_string());
        }
        if let Some(column) = get(ENV_PROVENANCE_COLUMN) {
            self.provenance_column = Some(column.trim().to_string());
        }
        if let Some(list) = get(ENV_REQUIRED_COLUMNS) {
            self.required_columns = Some(parse_column_list(&list));
        }
        if let Some(column) = get(ENV_DEDUP_COLUMN) {
            self.dedup_column = Some(column.trim().to_string());
        }
        self
    }

    /// Fills unset options with their defaults, logging each fallback, and
    /// validates the result.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let archive_path = match &self.archive_path {
            Some(p) => p.clone(),
            None => {
                warn!("No archive path configured, using default '{}'", DEFAULT_ARCHIVE_PATH);
                PathBuf::from(DEFAULT_ARCHIVE_PATH)
            }
        };

        let fingerprint_column = match &self.fingerprint_column {
            Some(c) => c.clone(),
            None => {
                warn!(
                    "No fingerprint column configured, using default '{}'",
                    DEFAULT_FINGERPRINT_COLUMN
                );
                DEFAULT_FINGERPRINT_COLUMN.to_string()
            }
        };

        let provenance_column = match &self.provenance_column {
            Some(c) => c.clone(),
            None => {
                warn!(
                    "No provenance column configured, using default '{}'",
                    DEFAULT_PROVENANCE_COLUMN
                );
                DEFAULT_PROVENANCE_COLUMN.to_string()
            }
        };

        let required_columns = match &self.required_columns {
            Some(cols) => cols.clone(),
            None => {
                warn!("No required columns configured, null filtering will be skipped");
                Vec::new()
            }
        };

        if self.dedup_column.is_none() {
            warn!("No dedup column configured, deduplication will be skipped");
        }

        let range = match &self.range {
            Some(r) => r.clone(),
            None => {
                let r = RangeRule::default();
                warn!(
                    "No range rule configured, using default: '{}' >= {}",
                    r.column, DEFAULT_RANGE_MIN
                );
                r
            }
        };

        let resolved = ResolvedConfig {
            archive_path,
            fingerprint_column,
            provenance_column,
            required_columns,
            dedup_column: self.dedup_column.clone(),
            range,
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

impl ResolvedConfig {
    fn validate(&self) -> Result<()> {
        let named = [
            ("fingerprint_column", Some(&self.fingerprint_column)),
            ("provenance_column", Some(&self.provenance_column)),
            ("dedup_column", self.dedup_column.as_ref()),
            ("range.column", Some(&self.range.column)),
        ];
        for (option, value) in named {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(CleanerError::Config(format!("'{}' must not be empty", option)));
                }
            }
        }

        if self.required_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(CleanerError::Config(
                "'required_columns' must not contain empty names".to_string(),
            ));
        }

        if self.fingerprint_column == self.provenance_column {
            return Err(CleanerError::Config(format!(
                "fingerprint and provenance columns must differ, both are '{}'",
                self.fingerprint_column
            )));
        }

        if let (Some(min), Some(max)) = (self.range.min, self.range.max) {
            if min > max {
                return Err(CleanerError::Config(format!(
                    "range for '{}' is empty: min {} > max {}",
                    self.range.column, min, max
                )));
            }
        }
        Ok(())
    }
}

/// Parses `a, b` or `'a', 'b'` into column names. Purely structural.
pub fn parse_column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = CleaningConfig::default().resolve().unwrap();
        assert_eq!(resolved.archive_path, PathBuf::from(DEFAULT_ARCHIVE_PATH));
        assert_eq!(resolved.fingerprint_column, "pk_hash");
        assert_eq!(resolved.provenance_column, "file_name");
        assert!(resolved.required_columns.is_empty());
        assert!(resolved.dedup_column.is_none());
        assert_eq!(resolved.range, RangeRule::default());
    }

    #[test]
    fn parses_toml() {
        let config = CleaningConfig::from_toml_str(
            r#"
            archive_path = "data/delivery.zip"
            required_columns = ["vin", "driver_id"]
            dedup_column = "pk_hash"

            [range]
            column = "total_driven_km"
            min = 0.0
            max = 1000000.0
            "#,
        )
        .unwrap();

        assert_eq!(config.archive_path, Some(PathBuf::from("data/delivery.zip")));
        assert_eq!(
            config.required_columns,
            Some(vec!["vin".to_string(), "driver_id".to_string()])
        );
        let range = config.range.unwrap();
        assert_eq!(range.max, Some(1_000_000.0));
        assert!(!range.coerce_in_place);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(CleaningConfig::from_toml_str("colums_to_dropna = \"a\"").is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_ARCHIVE_PATH, "/tmp/other.zip"),
            (ENV_REQUIRED_COLUMNS, "'vin', 'driver_id'"),
            (ENV_DEDUP_COLUMN, "  "),
        ]);
        let config = CleaningConfig {
            dedup_column: Some("pk_hash".to_string()),
            ..Default::default()
        }
        .with_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.archive_path, Some(PathBuf::from("/tmp/other.zip")));
        assert_eq!(
            config.required_columns,
            Some(vec!["vin".to_string(), "driver_id".to_string()])
        );
        // blank override is ignored
        assert_eq!(config.dedup_column.as_deref(), Some("pk_hash"));
    }

    #[test]
    fn column_list_parsing() {
        assert_eq!(parse_column_list("a,b"), vec!["a", "b"]);
        assert_eq!(parse_column_list(" \"a\" , 'b' ,"), vec!["a", "b"]);
        assert!(parse_column_list("").is_empty());
    }

    #[test]
    fn rejects_colliding_synthetic_columns() {
        let config = CleaningConfig {
            fingerprint_column: Some("file_name".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.resolve(), Err(CleanerError::Config(_))));
    }

    #[test]
    fn rejects_inverted_range() {
        let config = CleaningConfig {
            range: Some(RangeRule {
                min: Some(10.0),
                max: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(config.resolve(), Err(CleanerError::Config(_))));
    }

    #[test]
    fn missing_stage_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CleaningConfig::for_stage("DEV", dir.path()).unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn stage_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config_integ.toml"),
            "provenance_column = \"source_file\"\n",
        )
        .unwrap();
        let config = CleaningConfig::for_stage("INTEG", dir.path()).unwrap();
        assert_eq!(config.provenance_column.as_deref(), Some("source_file"));
    }
}
