mod basic;
mod database;

pub use basic::BasicConfig;
pub use database::DatabaseConfig;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Embedded database settings (see `database` table in config.toml).
    #[serde(default)]
    pub database: DatabaseConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.basic.listen_port, 8190);
        assert_eq!(cfg.database.storage_prefix, "patient-registration-db");
        assert_eq!(cfg.database.max_init_attempts, 3);
        assert_eq!(cfg.database.retry_delay_ms, 1000);
        assert!(cfg.database.rotate_storage_per_attempt);
        assert!(!cfg.database.in_memory);
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                listen_port = 9000

                [database]
                max_init_attempts = 5
                rotate_storage_per_attempt = false
                "#,
            ))
            .extract()
            .expect("valid config");

        assert_eq!(cfg.basic.listen_port, 9000);
        assert_eq!(cfg.basic.loglevel, "info");
        assert_eq!(cfg.database.max_init_attempts, 5);
        assert!(!cfg.database.rotate_storage_per_attempt);
        assert_eq!(cfg.database.data_dir, PathBuf::from("data"));
    }
}
