//! Database module: the single-connection actor over the embedded SQLite engine.
//!
//! Layout:
//! - `actor.rs`: the actor owning the connection, and its handle
//! - `bootstrap.rs`: initialization retry, readiness and reset
//! - `connector.rs`: storage identifiers and how connections are opened
//! - `console.rs`: raw SQL execution with typed cells
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database

pub mod actor;
pub mod bootstrap;
pub mod connector;
pub mod models;
pub mod schema;

mod console;

pub use actor::{DbActorHandle, DbStatus, spawn};
pub use bootstrap::DbOptions;
pub use connector::{
    Connector, SqliteFileConnector, SqliteMemoryConnector, StorageId, StorageNaming,
};
pub use models::DbPatient;
pub use schema::SQLITE_INIT;
