use crate::error::MedflowError;
use crate::server::router::MedflowState;
use crate::utils::logging::with_pretty_json_debug;
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use medflow_schema::QueryOutcome;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct ConsoleRequest {
    pub query: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleQuery {
    pub title: &'static str,
    pub query: &'static str,
}

pub const SAMPLE_QUERIES: &[SampleQuery] = &[
    SampleQuery {
        title: "All patients",
        query: "SELECT * FROM patients ORDER BY created_at DESC;",
    },
    SampleQuery {
        title: "Patients by gender",
        query: "SELECT gender, COUNT(*) AS count FROM patients GROUP BY gender;",
    },
    SampleQuery {
        title: "Registered in the last 7 days",
        query: "SELECT first_name, last_name, email, created_at FROM patients \
                WHERE created_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-7 days') \
                ORDER BY created_at DESC;",
    },
    SampleQuery {
        title: "Patients with medical conditions",
        query: "SELECT first_name, last_name, medical_conditions FROM patients \
                WHERE medical_conditions != '' AND medical_conditions IS NOT NULL;",
    },
    SampleQuery {
        title: "Patients per insurance provider",
        query: "SELECT insurance_provider, COUNT(*) AS patient_count FROM patients \
                GROUP BY insurance_provider ORDER BY patient_count DESC;",
    },
];

pub fn router() -> Router<MedflowState> {
    Router::new()
        .route("/api/sql", post(run_query))
        .route("/api/sql/samples", get(sample_queries))
}

/// POST /api/sql
///
/// Runs arbitrary SQL. Engine failures come back as `success: false` with status 200.
pub async fn run_query(
    State(state): State<MedflowState>,
    payload: Result<Json<ConsoleRequest>, JsonRejection>,
) -> Result<Json<QueryOutcome>, MedflowError> {
    let Json(request) = payload.map_err(|e| MedflowError::InvalidPayload(e.body_text()))?;
    if request.query.trim().is_empty() {
        return Err(MedflowError::InvalidPayload(
            "Please enter a SQL query".to_string(),
        ));
    }

    let outcome = state.db.execute_raw(&request.query).await?;
    info!(
        success = outcome.success,
        row_count = outcome.row_count,
        "SQL console query executed"
    );
    with_pretty_json_debug(&outcome, |json| debug!(outcome = %json, "SQL console result"));

    Ok(Json(outcome))
}

/// GET /api/sql/samples
pub async fn sample_queries() -> Json<&'static [SampleQuery]> {
    Json(SAMPLE_QUERIES)
}
