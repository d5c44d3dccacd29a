pub mod config;
pub mod db;
pub mod error;
pub mod server;

mod utils;

pub use error::MedflowError;
pub use medflow_schema::{Gender, NewPatient, Patient, QueryOutcome, QueryRow, SqlValue};
