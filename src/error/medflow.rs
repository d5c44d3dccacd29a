use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum MedflowError {
    #[error("database initialization failed after {attempts} attempts: {source}")]
    Initialization {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("a patient with email {email} is already registered")]
    DuplicateEmail { email: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl MedflowError {
    /// Classifies a failed patient write by the constraint the engine reported.
    pub(crate) fn from_patient_write(err: sqlx::Error, email: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return MedflowError::DuplicateEmail {
                        email: email.to_string(),
                    };
                }
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    return MedflowError::Validation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        MedflowError::DatabaseError(err)
    }
}

impl IntoResponse for MedflowError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            MedflowError::Initialization { attempts, .. } => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                let body = ApiErrorObject {
                    code: "DATABASE_UNAVAILABLE".to_string(),
                    message: format!(
                        "Database could not be initialized after {attempts} attempts. Retry via POST /api/system/reset."
                    ),
                    details: None,
                };
                (status, body)
            }

            MedflowError::DuplicateEmail { email } => {
                let status = StatusCode::CONFLICT;
                let body = ApiErrorObject {
                    code: "DUPLICATE_EMAIL".to_string(),
                    message: "A patient with this email is already registered.".to_string(),
                    details: Some(serde_json::json!({ "email": email })),
                };
                (status, body)
            }

            MedflowError::Validation(reason) => {
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let body = ApiErrorObject {
                    code: "VALIDATION_FAILED".to_string(),
                    message: "Patient record failed validation.".to_string(),
                    details: Some(Value::String(reason)),
                };
                (status, body)
            }

            MedflowError::InvalidPayload(reason) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorObject {
                    code: "INVALID_PAYLOAD".to_string(),
                    message: reason,
                    details: None,
                };
                (status, body)
            }

            MedflowError::DatabaseError(_)
            | MedflowError::RactorError(_)
            | MedflowError::UnexpectedError(_)
            | MedflowError::IoError(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn initialization_error_names_attempt_count() {
        let err = MedflowError::Initialization {
            attempts: 3,
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn non_constraint_write_errors_stay_database_errors() {
        let err = MedflowError::from_patient_write(sqlx::Error::RowNotFound, "a@b.c");
        assert!(matches!(err, MedflowError::DatabaseError(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn duplicate_email_maps_to_conflict() {
        let resp = MedflowError::DuplicateEmail {
            email: "a@b.c".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "DUPLICATE_EMAIL");
        assert_eq!(json["error"]["details"]["email"], "a@b.c");
    }
}
