use crate::error::{ApiErrorBody, ApiErrorObject, MedflowError};
use crate::server::router::MedflowState;
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use medflow_schema::{NewPatient, Patient};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryQuery {
    /// Search term; blank or absent lists everyone.
    #[serde(default)]
    pub q: Option<String>,
}

/// One directory line: the record plus its age as of today.
#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub patient: Patient,
    pub age: u32,
}

pub fn router() -> Router<MedflowState> {
    Router::new()
        .route(
            "/api/patients",
            get(patient_directory).post(register_patient),
        )
        .route("/api/patients/{id}", get(patient_detail))
}

/// POST /api/patients
pub async fn register_patient(
    State(state): State<MedflowState>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<Response, MedflowError> {
    let Json(patient) = payload.map_err(|e| MedflowError::InvalidPayload(e.body_text()))?;

    let created = state.db.insert_patient(patient).await?;
    info!(id = created.id, "Patient registered");

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /api/patients?q=term
pub async fn patient_directory(
    State(state): State<MedflowState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<DirectoryEntry>>, MedflowError> {
    let patients = match query.q.as_deref().filter(|term| !term.trim().is_empty()) {
        Some(term) => state.db.search_patients(term).await?,
        None => state.db.list_patients().await?,
    };

    let today = Utc::now().date_naive();
    let entries = patients
        .into_iter()
        .map(|patient| DirectoryEntry {
            age: patient.age_on(today),
            patient,
        })
        .collect();

    Ok(Json(entries))
}

/// GET /api/patients/{id}
pub async fn patient_detail(
    State(state): State<MedflowState>,
    Path(id): Path<i64>,
) -> Result<Response, MedflowError> {
    match state.db.find_patient(id).await? {
        Some(patient) => Ok(Json(patient).into_response()),
        None => {
            let body = ApiErrorBody {
                inner: ApiErrorObject {
                    code: "PATIENT_NOT_FOUND".to_string(),
                    message: format!("No patient with id {id}."),
                    details: None,
                },
            };
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}
