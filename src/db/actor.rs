use crate::db::bootstrap::{self, DbOptions};
use crate::db::connector::StorageId;
use crate::db::console;
use crate::db::models::{DbPatient, PATIENT_COLUMNS};
use crate::error::MedflowError;
use medflow_schema::{NewPatient, Patient, QueryOutcome};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

#[derive(Debug)]
pub enum DbActorMessage {
    /// Open the connection (with retry) unless already ready.
    Initialize(RpcReplyPort<Result<(), MedflowError>>),

    /// Close everything, forget earlier attempts and initialize again.
    Reset(RpcReplyPort<Result<(), MedflowError>>),

    /// Insert a patient and return the stored row.
    InsertPatient(NewPatient, RpcReplyPort<Result<Patient, MedflowError>>),

    /// All patients, newest first.
    ListPatients(RpcReplyPort<Result<Vec<Patient>, MedflowError>>),

    /// Get patient by id; `None` when absent.
    FindPatient(i64, RpcReplyPort<Result<Option<Patient>, MedflowError>>),

    /// Case-insensitive substring search over name, email and phone.
    SearchPatients(String, RpcReplyPort<Result<Vec<Patient>, MedflowError>>),

    /// Run arbitrary SQL text.
    ExecuteRaw(String, RpcReplyPort<Result<QueryOutcome, MedflowError>>),

    /// Readiness snapshot.
    Status(RpcReplyPort<DbStatus>),
}

/// Connection lifecycle as seen from outside the actor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DbStatus {
    pub ready: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub storage: Option<String>,
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

impl DbActorHandle {
    pub async fn initialize(&self) -> Result<(), MedflowError> {
        ractor::call!(self.actor, DbActorMessage::Initialize).map_err(|e| {
            MedflowError::RactorError(format!("DbActor Initialize RPC failed: {e}"))
        })?
    }

    pub async fn reset(&self) -> Result<(), MedflowError> {
        ractor::call!(self.actor, DbActorMessage::Reset)
            .map_err(|e| MedflowError::RactorError(format!("DbActor Reset RPC failed: {e}")))?
    }

    pub async fn insert_patient(&self, patient: NewPatient) -> Result<Patient, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::InsertPatient, patient).map_err(|e| {
            MedflowError::RactorError(format!("DbActor InsertPatient RPC failed: {e}"))
        })?
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::ListPatients).map_err(|e| {
            MedflowError::RactorError(format!("DbActor ListPatients RPC failed: {e}"))
        })?
    }

    pub async fn find_patient(&self, id: i64) -> Result<Option<Patient>, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::FindPatient, id).map_err(|e| {
            MedflowError::RactorError(format!("DbActor FindPatient RPC failed: {e}"))
        })?
    }

    pub async fn search_patients(&self, term: &str) -> Result<Vec<Patient>, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::SearchPatients, term.to_string()).map_err(
            |e| MedflowError::RactorError(format!("DbActor SearchPatients RPC failed: {e}")),
        )?
    }

    pub async fn execute_raw(&self, sql: &str) -> Result<QueryOutcome, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::ExecuteRaw, sql.to_string()).map_err(|e| {
            MedflowError::RactorError(format!("DbActor ExecuteRaw RPC failed: {e}"))
        })?
    }

    pub async fn status(&self) -> Result<DbStatus, MedflowError> {
        ractor::call!(self.actor, DbActorMessage::Status)
            .map_err(|e| MedflowError::RactorError(format!("DbActor Status RPC failed: {e}")))
    }
}

pub(crate) struct DbActorState {
    pub(crate) options: DbOptions,
    pub(crate) conn: Option<SqliteConnection>,
    pub(crate) storage: Option<StorageId>,
    pub(crate) ready: bool,
    pub(crate) attempts: u32,
}

impl DbActorState {
    fn new(options: DbOptions) -> Self {
        Self {
            options,
            conn: None,
            storage: None,
            ready: false,
            attempts: 0,
        }
    }

    /// The live connection, initializing first when needed.
    async fn ready_connection(&mut self) -> Result<&mut SqliteConnection, MedflowError> {
        bootstrap::ensure_ready(self).await?;
        self.conn.as_mut().ok_or_else(|| {
            MedflowError::UnexpectedError("ready without an open connection".to_string())
        })
    }

    fn status(&self) -> DbStatus {
        DbStatus {
            ready: self.ready,
            attempts: self.attempts,
            max_attempts: self.options.max_attempts,
            storage: self.storage.as_ref().map(ToString::to_string),
        }
    }
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = DbOptions;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        options: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(
            storage_prefix = %options.naming.prefix,
            rotate_per_attempt = options.naming.rotate_per_attempt,
            max_attempts = options.max_attempts,
            retry_delay_ms = u64::try_from(options.retry_delay.as_millis()).unwrap_or(u64::MAX),
            "DbActor started"
        );
        Ok(DbActorState::new(options))
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(conn) = state.conn.take() {
            use sqlx::Connection as _;
            let _ = conn.close().await;
        }
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Initialize(reply) => {
                let res = bootstrap::initialize(state).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Reset(reply) => {
                let res = bootstrap::reset(state).await;
                let _ = reply.send(res);
            }
            DbActorMessage::InsertPatient(patient, reply) => {
                let res = match state.ready_connection().await {
                    Ok(conn) => self.insert_patient(conn, patient).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            DbActorMessage::ListPatients(reply) => {
                let res = match state.ready_connection().await {
                    Ok(conn) => self.list_patients(conn).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            DbActorMessage::FindPatient(id, reply) => {
                let res = match state.ready_connection().await {
                    Ok(conn) => self.find_patient(conn, id).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            DbActorMessage::SearchPatients(term, reply) => {
                let res = match state.ready_connection().await {
                    Ok(conn) => self.search_patients(conn, &term).await,
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            DbActorMessage::ExecuteRaw(sql, reply) => {
                let res = match state.ready_connection().await {
                    Ok(conn) => Ok(console::execute_raw(conn, &sql).await),
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }
            DbActorMessage::Status(reply) => {
                let _ = reply.send(state.status());
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn insert_patient(
        &self,
        conn: &mut SqliteConnection,
        patient: NewPatient,
    ) -> Result<Patient, MedflowError> {
        let sql = format!(
            r#"
            INSERT INTO patients (
                first_name, last_name, email, phone, date_of_birth, gender,
                address, emergency_contact_name, emergency_contact_phone,
                medical_conditions, medications, insurance_provider, insurance_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {PATIENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, DbPatient>(&sql)
            .bind(&patient.first_name)
            .bind(&patient.last_name)
            .bind(&patient.email)
            .bind(&patient.phone)
            .bind(patient.date_of_birth)
            .bind(patient.gender.as_str())
            .bind(&patient.address)
            .bind(&patient.emergency_contact_name)
            .bind(&patient.emergency_contact_phone)
            .bind(&patient.medical_conditions)
            .bind(&patient.medications)
            .bind(&patient.insurance_provider)
            .bind(&patient.insurance_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| MedflowError::from_patient_write(e, &patient.email))?;

        debug!(id = row.id, "Patient registered");
        Ok(row.into())
    }

    async fn list_patients(&self, conn: &mut SqliteConnection) -> Result<Vec<Patient>, MedflowError> {
        let sql = format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patients
            ORDER BY created_at DESC, id DESC
            "#
        );

        let rows = sqlx::query_as::<_, DbPatient>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(Patient::from).collect())
    }

    async fn find_patient(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<Patient>, MedflowError> {
        let sql = format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patients
            WHERE id = ?
            "#
        );

        let row = sqlx::query_as::<_, DbPatient>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Patient::from))
    }

    /// Filters the ordered listing in Rust: SQLite's `lower` only folds ASCII.
    async fn search_patients(
        &self,
        conn: &mut SqliteConnection,
        term: &str,
    ) -> Result<Vec<Patient>, MedflowError> {
        let needle = term.to_lowercase();
        let patients = self.list_patients(conn).await?;

        Ok(patients
            .into_iter()
            .filter(|patient| matches_term(patient, &needle))
            .collect())
    }
}

/// `needle` must already be lowercased.
fn matches_term(patient: &Patient, needle: &str) -> bool {
    [
        &patient.first_name,
        &patient.last_name,
        &patient.email,
        &patient.phone,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Spawn the database actor and return a cloneable handle.
///
/// The connection is not opened here; call [`DbActorHandle::initialize`] or let the first
/// data operation do it.
pub async fn spawn(options: DbOptions) -> DbActorHandle {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, options)
        .await
        .expect("failed to spawn DbActor");

    DbActorHandle { actor }
}
