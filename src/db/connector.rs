//! Opening connections to the embedded engine.
//!
//! Each storage identifier is a distinct durable database. The file connector maps an
//! identifier to `<data_dir>/<identifier>.sqlite`.

use async_trait::async_trait;
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use tracing::debug;

/// Name of one durable database instance: `<prefix>-v<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageId {
    prefix: String,
    version: u32,
}

impl StorageId {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.prefix, self.version)
    }
}

/// Picks the storage identifier for an initialization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNaming {
    pub prefix: String,
    /// Every attempt gets its own identifier; otherwise all attempts reuse `-v1`.
    pub rotate_per_attempt: bool,
}

impl StorageNaming {
    pub fn new(prefix: impl Into<String>, rotate_per_attempt: bool) -> Self {
        Self {
            prefix: prefix.into(),
            rotate_per_attempt,
        }
    }

    /// `attempt` is 1-based.
    pub fn storage_for_attempt(&self, attempt: u32) -> StorageId {
        let version = if self.rotate_per_attempt {
            attempt.max(1)
        } else {
            1
        };
        StorageId::new(self.prefix.clone(), version)
    }

    /// Identifiers opened by earlier attempts that were abandoned when `succeeded` won.
    pub fn abandoned_before(&self, succeeded: &StorageId) -> Vec<StorageId> {
        if !self.rotate_per_attempt {
            return Vec::new();
        }
        (1..succeeded.version())
            .map(|version| StorageId::new(self.prefix.clone(), version))
            .collect()
    }
}

/// Opens engine connections for a storage identifier.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, storage: &StorageId) -> Result<SqliteConnection, sqlx::Error>;

    /// Human-readable location of `storage`, for logs.
    fn describe(&self, storage: &StorageId) -> String;
}

/// One SQLite file per storage identifier under `data_dir`.
#[derive(Debug, Clone)]
pub struct SqliteFileConnector {
    data_dir: PathBuf,
}

impl SqliteFileConnector {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, storage: &StorageId) -> PathBuf {
        self.data_dir.join(format!("{storage}.sqlite"))
    }
}

#[async_trait]
impl Connector for SqliteFileConnector {
    async fn open(&self, storage: &StorageId) -> Result<SqliteConnection, sqlx::Error> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let path = self.path_for(storage);
        debug!(path = %path.display(), "Opening SQLite file");

        let connect_opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        connect_opts.connect().await
    }

    fn describe(&self, storage: &StorageId) -> String {
        self.path_for(storage).display().to_string()
    }
}

/// Private in-memory database per connection. Nothing survives a close.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteMemoryConnector;

#[async_trait]
impl Connector for SqliteMemoryConnector {
    async fn open(&self, _storage: &StorageId) -> Result<SqliteConnection, sqlx::Error> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        connect_opts.connect().await
    }

    fn describe(&self, storage: &StorageId) -> String {
        format!("memory:{storage}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotating_naming_tracks_attempt_number() {
        let naming = StorageNaming::new("patient-registration-db", true);
        assert_eq!(
            naming.storage_for_attempt(1).to_string(),
            "patient-registration-db-v1"
        );
        assert_eq!(
            naming.storage_for_attempt(3).to_string(),
            "patient-registration-db-v3"
        );
    }

    #[test]
    fn fixed_naming_always_reuses_first_identifier() {
        let naming = StorageNaming::new("registry", false);
        assert_eq!(naming.storage_for_attempt(1), naming.storage_for_attempt(3));
        assert!(naming.abandoned_before(&StorageId::new("registry", 1)).is_empty());
    }

    #[test]
    fn abandoned_identifiers_precede_the_winning_attempt() {
        let naming = StorageNaming::new("registry", true);
        let abandoned = naming.abandoned_before(&naming.storage_for_attempt(3));
        let names: Vec<String> = abandoned.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["registry-v1", "registry-v2"]);
    }

    #[test]
    fn file_connector_places_one_file_per_identifier() {
        let connector = SqliteFileConnector::new("/var/lib/medflow");
        assert_eq!(
            connector.path_for(&StorageId::new("registry", 2)),
            PathBuf::from("/var/lib/medflow/registry-v2.sqlite")
        );
    }
}
