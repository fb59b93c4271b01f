/// Default names and environment keys shared across the cleaner.
/// Every option left unset in configuration falls back to one of these.

// Synthetic columns attached while unpacking
pub const DEFAULT_FINGERPRINT_COLUMN: &str = "pk_hash";
pub const DEFAULT_PROVENANCE_COLUMN: &str = "file_name";

// Range filter defaults
pub const DEFAULT_RANGE_COLUMN: &str = "total_driven_km";
pub const DEFAULT_RANGE_MIN: f64 = 0.0;

pub const DEFAULT_ARCHIVE_PATH: &str = "data/meta_data_archive.zip";

/// Joins rendered field values before hashing. Not escaped inside values.
pub const FINGERPRINT_DELIMITER: &str = ",";

// Stage-based config file lookup
pub const DEFAULT_STAGE: &str = "LOCAL";
pub const DEFAULT_CONFIG_DIR: &str = "config";

pub const ENV_STAGE: &str = "STAGE";
pub const ENV_CONFIG_DIR: &str = "CLEANER_CONFIG_DIR";
pub const ENV_ARCHIVE_PATH: &str = "CLEANER_ARCHIVE_PATH";
pub const ENV_FINGERPRINT_COLUMN: &str = "CLEANER_FINGERPRINT_COLUMN";
pub const ENV_PROVENANCE_COLUMN: &str = "CLEANER_PROVENANCE_COLUMN";
pub const ENV_REQUIRED_COLUMNS: &str = "CLEANER_REQUIRED_COLUMNS";
pub const ENV_DEDUP_COLUMN: &str = "CLEANER_DEDUP_COLUMN";

/// Config file name for a deployment stage, e.g. `LOCAL` -> `config_local.toml`.
pub fn config_file_for_stage(stage: &str) -> String {
    format!("config_{}.toml", stage.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_file_names_are_lowercase() {
        assert_eq!(config_file_for_stage("LOCAL"), "config_local.toml");
        assert_eq!(config_file_for_stage(" Prod "), "config_prod.toml");
    }
}
