use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use medflow::db::{Connector, DbOptions, SqliteMemoryConnector, StorageId, StorageNaming};
use medflow::server::{MedflowState, medflow_router};
use serde_json::{Value, json};
use sqlx::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn memory_app() -> Router {
    let opts = DbOptions::new(
        Arc::new(SqliteMemoryConnector),
        StorageNaming::new("patient-registration-db", true),
    )
    .with_retry_delay(Duration::from_millis(10));
    let db = medflow::db::spawn(opts).await;
    medflow_router(MedflowState::new(db))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let resp = app
        .clone()
        .oneshot(builder.body(body).expect("failed to build request"))
        .await
        .expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn registration(email: &str) -> Value {
    json!({
        "first_name": "Alan",
        "last_name": "Turing",
        "email": email,
        "phone": "555-0177",
        "date_of_birth": "1912-06-23",
        "gender": "male",
        "address": "Wilmslow, Cheshire",
        "emergency_contact_name": "Ethel Turing",
        "emergency_contact_phone": "555-0178",
        "medical_conditions": "",
        "medications": "",
        "insurance_provider": "NHS",
        "insurance_id": "NHS-1912"
    })
}

#[tokio::test]
async fn patient_routes_register_list_and_fetch() {
    let app = memory_app().await;

    // 1) register -> 201 with the stored row
    let (status, created) = send(
        &app,
        "POST",
        "/api/patients",
        Some(registration("alan@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("id must be numeric");
    assert!(id > 0);
    assert_eq!(created["gender"], "male");
    assert!(created["created_at"].is_string());

    // 2) same email again -> 409
    let (status, body) = send(
        &app,
        "POST",
        "/api/patients",
        Some(registration("alan@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");

    // 3) unknown gender -> 400
    let mut bad = registration("other@example.com");
    bad["gender"] = json!("robot");
    let (status, body) = send(&app, "POST", "/api/patients", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");

    // 4) blank required field -> 422
    let mut blank = registration("blank@example.com");
    blank["address"] = json!("  ");
    let (status, body) = send(&app, "POST", "/api/patients", Some(blank)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

    // 5) directory lists the one patient with an age
    let (status, list) = send(&app, "GET", "/api/patients", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = list.as_array().expect("directory must be an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], id);
    assert!(entries[0]["age"].as_u64().unwrap() >= 113);

    // 6) search hits and misses; a blank term lists everyone
    let (_, hits) = send(&app, "GET", "/api/patients?q=TURING", None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    let (_, misses) = send(&app, "GET", "/api/patients?q=nobody", None).await;
    assert!(misses.as_array().unwrap().is_empty());
    let (_, blank_q) = send(&app, "GET", "/api/patients?q=%20%20", None).await;
    assert_eq!(blank_q.as_array().unwrap().len(), 1);

    // 7) detail by id, then a missing id -> 404
    let (status, detail) = send(&app, "GET", &format!("/api/patients/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["email"], "alan@example.com");
    let (status, body) = send(&app, "GET", "/api/patients/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PATIENT_NOT_FOUND");
}

#[tokio::test]
async fn sql_console_returns_outcomes_as_values() {
    let app = memory_app().await;

    // 1) simple select
    let (status, body) = send(&app, "POST", "/api/sql", Some(json!({ "query": "SELECT 1 AS one" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["row_count"], 1);
    assert_eq!(body["fields"], json!(["one"]));
    assert_eq!(body["rows"][0]["one"], json!({ "type": "integer", "value": 1 }));

    // 2) engine error is still a 200 with success=false
    let (status, body) = send(
        &app,
        "POST",
        "/api/sql",
        Some(json!({ "query": "SELECT * FROM nonexistent_table" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("no such table")
    );

    // 3) blank query -> 400
    let (status, body) = send(&app, "POST", "/api/sql", Some(json!({ "query": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");

    // 4) samples are served as-is
    let (status, body) = send(&app, "GET", "/api/sql/samples", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());
    assert!(body[0]["query"].as_str().unwrap().contains("patients"));
}

#[tokio::test]
async fn system_routes_report_and_reset() {
    let app = memory_app().await;

    let (status, body) = send(&app, "GET", "/api/system/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], false);
    assert_eq!(body["attempts"], 0);

    let (status, body) = send(&app, "POST", "/api/system/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["storage"], "patient-registration-db-v1");

    let (status, _) = send(&app, "GET", "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct UnreachableConnector;

#[async_trait]
impl Connector for UnreachableConnector {
    async fn open(&self, _storage: &StorageId) -> Result<SqliteConnection, sqlx::Error> {
        Err(sqlx::Error::Io(std::io::Error::other("disk offline")))
    }

    fn describe(&self, storage: &StorageId) -> String {
        format!("offline:{storage}")
    }
}

#[tokio::test]
async fn unavailable_database_maps_to_503() {
    let opts = DbOptions::new(
        Arc::new(UnreachableConnector),
        StorageNaming::new("patient-registration-db", true),
    )
    .with_max_attempts(2)
    .with_retry_delay(Duration::from_millis(5));
    let db = medflow::db::spawn(opts).await;
    let app = medflow_router(MedflowState::new(db));

    let (status, body) = send(&app, "GET", "/api/patients", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "DATABASE_UNAVAILABLE");

    let (status, body) = send(&app, "POST", "/api/sql", Some(json!({ "query": "SELECT 1" }))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "DATABASE_UNAVAILABLE");

    let (status, body) = send(&app, "GET", "/api/system/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], false);
}
