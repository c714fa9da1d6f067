//! In-memory schema and instance stores.
//!
//! The stores are built once per run and then only read. Writes take
//! `&mut self`, so the borrow checker serializes them against reads.

pub mod error;
mod instance;
mod schema;

pub use error::{StoreError, StoreResult};
pub use instance::InstanceStore;
pub use schema::SchemaStore;
