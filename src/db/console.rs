//! Raw SQL console: run arbitrary text, hand back typed cells.
//!
//! Statement type is unrestricted. Engine failures become a failed [`QueryOutcome`]
//! instead of an error.

use chrono::{DateTime, NaiveDateTime, Utc};
use medflow_schema::{QueryOutcome, QueryRow, SqlValue};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::debug;

pub(crate) async fn execute_raw(conn: &mut SqliteConnection, sql: &str) -> QueryOutcome {
    let rows = match sqlx::query(sql).persistent(false).fetch_all(&mut *conn).await {
        Ok(rows) => rows,
        Err(err) => {
            debug!(error = %err, "SQL console statement failed");
            return QueryOutcome::failure(engine_message(&err));
        }
    };

    let fields = match rows.first() {
        Some(row) => row
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect(),
        None => describe_columns(conn, sql).await,
    };
    let rows = rows.iter().map(convert_row).collect();

    QueryOutcome::success(fields, rows)
}

/// Column names of a statement that produced no rows.
async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<String> {
    match (&mut *conn).prepare(sql).await {
        Ok(statement) => statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect(),
        Err(err) => {
            debug!(error = %err, "Could not describe statement columns");
            Vec::new()
        }
    }
}

fn engine_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

fn convert_row(row: &SqliteRow) -> QueryRow {
    let mut out = QueryRow::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = cell_value(row, column.ordinal(), column.type_info().name());
        out.push(column.name(), value);
    }
    out
}

/// Maps one cell by its storage class, using the declared column type as a hint for
/// booleans and timestamps.
fn cell_value(row: &SqliteRow, index: usize, declared: &str) -> SqlValue {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return SqlValue::Null,
    };

    match storage.as_str() {
        "INTEGER" | "BOOLEAN" => {
            let v: i64 = row.try_get_unchecked(index).unwrap_or_default();
            if storage == "BOOLEAN" || is_boolean(declared) {
                SqlValue::Boolean(v != 0)
            } else {
                SqlValue::Integer(v)
            }
        }
        "REAL" => SqlValue::Float(row.try_get_unchecked(index).unwrap_or_default()),
        "BLOB" => SqlValue::Blob(row.try_get_unchecked(index).unwrap_or_default()),
        _ => {
            let text: String = row.try_get_unchecked(index).unwrap_or_default();
            if is_timestamp(declared) {
                match parse_timestamp(&text) {
                    Some(ts) => SqlValue::Timestamp(ts),
                    None => SqlValue::Text(text),
                }
            } else {
                SqlValue::Text(text)
            }
        }
    }
}

fn is_boolean(declared: &str) -> bool {
    declared.eq_ignore_ascii_case("BOOLEAN") || declared.eq_ignore_ascii_case("BOOL")
}

fn is_timestamp(declared: &str) -> bool {
    declared.eq_ignore_ascii_case("DATETIME") || declared.eq_ignore_ascii_case("TIMESTAMP")
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    // SQLite's own CURRENT_TIMESTAMP / datetime() format.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
