//! Wire types shared between the registry service and its clients.
//!
//! - `patient`: the patient record and the registration payload
//! - `console`: typed results of the raw SQL console

pub mod console;
pub mod patient;

pub use console::{QueryOutcome, QueryRow, SqlValue};
pub use patient::{Gender, NewPatient, Patient};
