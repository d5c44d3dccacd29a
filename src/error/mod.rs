mod medflow;

pub use medflow::{ApiErrorBody, ApiErrorObject, MedflowError};
