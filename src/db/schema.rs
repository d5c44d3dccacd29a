//! SQL DDL for initializing the database schema.

/// Liveness probe issued right after a connection is opened.
pub const LIVENESS_PROBE: &str = "SELECT 1";

/// SQLite schema includes:
/// - `patients` table (one registered person per row, `email` unique)
///
/// Required text columns reject blank values and keep their registration-form length
/// limits, so rows written through the SQL console are held to the same rules. Dates and
/// timestamps must stay readable as `NaiveDate` / `DateTime<Utc>`, or the typed patient
/// queries would fail on every later read.
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Patients
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL CHECK (typeof(first_name) = 'text' AND trim(first_name) <> '' AND length(first_name) <= 100),
    last_name TEXT NOT NULL CHECK (typeof(last_name) = 'text' AND trim(last_name) <> '' AND length(last_name) <= 100),
    email TEXT NOT NULL UNIQUE CHECK (typeof(email) = 'text' AND trim(email) <> '' AND length(email) <= 255),
    phone TEXT NOT NULL CHECK (typeof(phone) = 'text' AND trim(phone) <> '' AND length(phone) <= 20),
    -- YYYY-MM-DD, and a real calendar day
    date_of_birth DATE NOT NULL CHECK (typeof(date_of_birth) = 'text' AND date(date_of_birth) IS NOT NULL AND date(date_of_birth) = date_of_birth),
    gender TEXT NOT NULL CHECK (typeof(gender) = 'text' AND trim(gender) <> '' AND length(gender) <= 20),
    address TEXT NOT NULL CHECK (typeof(address) = 'text' AND trim(address) <> ''),
    emergency_contact_name TEXT NOT NULL CHECK (typeof(emergency_contact_name) = 'text' AND trim(emergency_contact_name) <> '' AND length(emergency_contact_name) <= 100),
    emergency_contact_phone TEXT NOT NULL CHECK (typeof(emergency_contact_phone) = 'text' AND trim(emergency_contact_phone) <> '' AND length(emergency_contact_phone) <= 20),
    medical_conditions TEXT DEFAULT '' CHECK (typeof(medical_conditions) IN ('text', 'null')),
    medications TEXT DEFAULT '' CHECK (typeof(medications) IN ('text', 'null')),
    insurance_provider TEXT NOT NULL CHECK (typeof(insurance_provider) = 'text' AND trim(insurance_provider) <> '' AND length(insurance_provider) <= 100),
    insurance_id TEXT NOT NULL CHECK (typeof(insurance_id) = 'text' AND trim(insurance_id) <> '' AND length(insurance_id) <= 50),
    -- RFC3339, console writes may also use SQLite's 'YYYY-MM-DD HH:MM[:SS[.fff]]' form
    created_at TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        CHECK (julianday(created_at) IS NOT NULL AND (typeof(created_at) <> 'text' OR created_at GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9][ T][0-9][0-9]:[0-9][0-9]*')),
    updated_at TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        CHECK (julianday(updated_at) IS NOT NULL AND (typeof(updated_at) <> 'text' OR updated_at GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9][ T][0-9][0-9]:[0-9][0-9]*'))
);

CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);
"#;
