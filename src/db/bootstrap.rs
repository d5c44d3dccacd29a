//! Connection lifecycle: bounded initialization retry, readiness and reset.

use super::actor::DbActorState;
use super::connector::{
    Connector, SqliteFileConnector, SqliteMemoryConnector, StorageId, StorageNaming,
};
use super::schema::{LIVENESS_PROBE, SQLITE_INIT};
use crate::config::DatabaseConfig;
use crate::error::MedflowError;
use backon::{ConstantBuilder, Retryable};
use sqlx::{Connection, SqliteConnection};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Everything the database actor needs to (re)open its connection.
#[derive(Clone)]
pub struct DbOptions {
    pub connector: Arc<dyn Connector>,
    pub naming: StorageNaming,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl DbOptions {
    pub fn new(connector: Arc<dyn Connector>, naming: StorageNaming) -> Self {
        Self {
            connector,
            naming,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn from_config(cfg: &DatabaseConfig) -> Self {
        let connector: Arc<dyn Connector> = if cfg.in_memory {
            Arc::new(SqliteMemoryConnector)
        } else {
            Arc::new(SqliteFileConnector::new(cfg.data_dir.clone()))
        };
        Self::new(
            connector,
            StorageNaming::new(cfg.storage_prefix.clone(), cfg.rotate_storage_per_attempt),
        )
        .with_max_attempts(cfg.max_init_attempts)
        .with_retry_delay(Duration::from_millis(cfg.retry_delay_ms))
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

pub(super) async fn ensure_ready(state: &mut DbActorState) -> Result<(), MedflowError> {
    if state.ready {
        return Ok(());
    }
    initialize(state).await
}

/// Opens, probes and migrates a connection, retrying with a fixed delay until the attempt
/// budget is spent. Attempts already recorded on `state` count against the budget.
pub(super) async fn initialize(state: &mut DbActorState) -> Result<(), MedflowError> {
    if state.ready {
        return Ok(());
    }

    if let Some(conn) = state.conn.take() {
        close_quietly(conn, state.storage.as_ref()).await;
    }
    state.storage = None;

    let opts = state.options.clone();
    let counter = AtomicU32::new(state.attempts);
    let retries = opts
        .max_attempts
        .saturating_sub(state.attempts.saturating_add(1));
    let policy = ConstantBuilder::default()
        .with_delay(opts.retry_delay)
        .with_max_times(retries as usize);

    let outcome = {
        let counter = &counter;
        let opts = &opts;
        (move || async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let storage = opts.naming.storage_for_attempt(attempt);
            open_storage(opts.connector.as_ref(), &storage, attempt)
                .await
                .map(|conn| (conn, storage))
        })
        .retry(policy)
        .notify(|err: &sqlx::Error, delay: Duration| {
            warn!(
                error = %err,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Database initialization attempt failed; retrying"
            );
        })
        .await
    };

    state.attempts = counter.load(Ordering::SeqCst);

    match outcome {
        Ok((conn, storage)) => {
            let abandoned = opts.naming.abandoned_before(&storage);
            if !abandoned.is_empty() {
                warn!(
                    storage = %storage,
                    abandoned = ?abandoned.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "Earlier attempts used other storage identifiers; they may be left orphaned"
                );
            }
            info!(
                attempts = state.attempts,
                storage = %storage,
                location = %opts.connector.describe(&storage),
                "Database initialized"
            );
            state.conn = Some(conn);
            state.storage = Some(storage);
            state.ready = true;
            Ok(())
        }
        Err(source) => {
            error!(
                attempts = state.attempts,
                error = %source,
                "Database initialization failed; giving up"
            );
            Err(MedflowError::Initialization {
                attempts: state.attempts,
                source,
            })
        }
    }
}

/// Drops readiness and the attempt budget, closes the connection and starts over.
pub(super) async fn reset(state: &mut DbActorState) -> Result<(), MedflowError> {
    info!(
        storage = %state.storage.as_ref().map_or_else(|| "<none>".to_string(), ToString::to_string),
        "Database reset requested"
    );
    state.ready = false;
    state.attempts = 0;
    if let Some(conn) = state.conn.take() {
        close_quietly(conn, state.storage.as_ref()).await;
    }
    state.storage = None;

    initialize(state).await
}

async fn open_storage(
    connector: &dyn Connector,
    storage: &StorageId,
    attempt: u32,
) -> Result<SqliteConnection, sqlx::Error> {
    info!(
        attempt,
        storage = %storage,
        location = %connector.describe(storage),
        "Opening database"
    );
    let mut conn = connector.open(storage).await?;
    if let Err(err) = prepare_connection(&mut conn).await {
        close_quietly(conn, Some(storage)).await;
        return Err(err);
    }
    Ok(conn)
}

async fn prepare_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>(LIVENESS_PROBE)
        .fetch_one(&mut *conn)
        .await?;
    apply_schema(conn).await
}

async fn apply_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(&mut *conn).await?;
    }
    Ok(())
}

async fn close_quietly(conn: SqliteConnection, storage: Option<&StorageId>) {
    if let Err(err) = conn.close().await {
        warn!(
            storage = %storage.map_or_else(|| "<none>".to_string(), ToString::to_string),
            error = %err,
            "Failed to close database connection; ignoring"
        );
    }
}
