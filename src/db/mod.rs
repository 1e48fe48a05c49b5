//! Durable metadata storage for quarantine entries.

pub mod database;

pub use database::{DatabaseError, DatabaseResult, NewEntry, QuarantineDatabase};
