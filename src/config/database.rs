use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Embedded SQLite settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding one SQLite file per storage identifier.
    /// TOML: `database.data_dir`. Default: `data`.
    pub data_dir: PathBuf,

    /// Storage identifier prefix; files are named `<prefix>-v<attempt>.sqlite`.
    /// TOML: `database.storage_prefix`. Default: `patient-registration-db`.
    pub storage_prefix: String,

    /// Keep everything in memory (nothing survives a restart or a reset).
    /// TOML: `database.in_memory`. Default: `false`.
    pub in_memory: bool,

    /// Initialization attempts before giving up.
    /// TOML: `database.max_init_attempts`. Default: `3`.
    pub max_init_attempts: u32,

    /// Fixed delay between initialization attempts, in milliseconds.
    /// TOML: `database.retry_delay_ms`. Default: `1000`.
    pub retry_delay_ms: u64,

    /// Open a fresh storage identifier for every attempt (`-v1`, `-v2`, ...).
    /// When `false`, every attempt reopens `-v1`.
    /// TOML: `database.rotate_storage_per_attempt`. Default: `true`.
    pub rotate_storage_per_attempt: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            storage_prefix: "patient-registration-db".to_string(),
            in_memory: false,
            max_init_attempts: 3,
            retry_delay_ms: 1000,
            rotate_storage_per_attempt: true,
        }
    }
}
