pub mod router;
pub mod routes;

pub use router::{MedflowState, medflow_router};
