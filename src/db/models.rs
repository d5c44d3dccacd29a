use chrono::{DateTime, NaiveDate, Utc};
use medflow_schema::Patient;
use sqlx::FromRow;

/// Column list shared by every typed `patients` query.
pub(crate) const PATIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, date_of_birth, gender, address, \
     emergency_contact_name, emergency_contact_phone, medical_conditions, medications, \
     insurance_provider, insurance_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbPatient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    /// Nullable in storage; console writes may store NULL.
    pub medical_conditions: Option<String>,
    pub medications: Option<String>,
    pub insurance_provider: String,
    pub insurance_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPatient> for Patient {
    fn from(row: DbPatient) -> Self {
        Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            address: row.address,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_phone: row.emergency_contact_phone,
            medical_conditions: row.medical_conditions.unwrap_or_default(),
            medications: row.medications.unwrap_or_default(),
            insurance_provider: row.insurance_provider,
            insurance_id: row.insurance_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
