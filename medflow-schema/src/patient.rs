use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A stored patient record, as returned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    /// Kept as free text: rows written through the SQL console may carry any value.
    pub gender: String,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub medical_conditions: String,
    pub medications: String,
    pub insurance_provider: String,
    pub insurance_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Age in whole years on `today`.
    ///
    /// Returns 0 for birth dates in the future.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let Some(mut years) = today.year().checked_sub(self.date_of_birth.year()) else {
            return 0;
        };
        if (today.month(), today.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            years -= 1;
        }
        u32::try_from(years).unwrap_or(0)
    }
}

/// Registration payload: every patient field except the engine-assigned ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    #[serde(default)]
    pub medical_conditions: String,
    #[serde(default)]
    pub medications: String,
    pub insurance_provider: String,
    pub insurance_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::PreferNotToSay => "prefer-not-to-say",
        }
    }
}
