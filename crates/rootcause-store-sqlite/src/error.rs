//! Error type for `rootcause-store-sqlite`.

use rootcause_core::store::RepositoryError;
use rusqlite::ffi;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  /// A write collided with an existing row: a duplicate id, or a second
  /// active report for the same failure signature.
  #[error("constraint conflict: {0}")]
  Conflict(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column holds a value this version cannot decode.
  #[error("cannot decode column `{column}` value {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("report not found: {0}")]
  NotFound(Uuid),

  #[error("report {0} does not satisfy the patch precondition")]
  PreconditionFailed(Uuid),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, msg)) = &e
      && matches!(
        failure.extended_code,
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
      )
    {
      return Self::Conflict(msg.clone().unwrap_or_else(|| failure.to_string()));
    }
    Self::Database(e)
  }
}

impl RepositoryError for Error {
  fn is_conflict(&self) -> bool {
    matches!(self, Self::Conflict(_) | Self::PreconditionFailed(_))
  }

  fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
