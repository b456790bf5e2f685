//! SQLite backend for root cause reports.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Uniqueness of active failure
//! signatures is enforced by a partial unique index, so concurrent engines
//! sharing one database file still see at most one active report per
//! signature.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
