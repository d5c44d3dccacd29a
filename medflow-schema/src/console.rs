use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A single cell returned by the SQL console, tagged with its scalar type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
    Blob(#[serde(with = "blob_base64")] Vec<u8>),
}

mod blob_base64 {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// One result row: column name to value, in the column order reported by the engine.
///
/// Serialized as a JSON object. Duplicate column names are kept in the row but the
/// later cell wins on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    cells: Vec<(String, SqlValue)>,
}

impl QueryRow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.cells.push((column.into(), value));
    }

    /// First cell named `column`.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

}

impl Serialize for QueryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Result of running arbitrary SQL text. Failures are values, not errors.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryOutcome {
    pub success: bool,
    pub rows: Vec<QueryRow>,
    pub row_count: usize,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn success(fields: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            success: true,
            row_count: rows.len(),
            rows,
            fields,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            row_count: 0,
            fields: Vec::new(),
            error: Some(message.into()),
        }
    }
}
