//! Error types for `rootcause-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{report::ReportStatus, severity::SeverityPriority};

#[derive(Debug, Error)]
pub enum Error {
  /// A trigger event is missing a required field. Raised before any
  /// repository I/O.
  #[error("invalid trigger event: missing required field `{field}`")]
  Validation { field: &'static str },

  /// The report repository could not serve the request. Callers may retry.
  #[error("report repository unavailable: {0}")]
  RepositoryUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A concurrent writer won the race twice in a row for the same signature.
  #[error("conflict on signature {signature} persisted after retry")]
  ConflictRetryExhausted { signature: String },

  #[error("report not found: {0}")]
  ReportNotFound(Uuid),

  #[error("report {id} cannot move from {from} to {to}")]
  InvalidTransition {
    id:   Uuid,
    from: ReportStatus,
    to:   ReportStatus,
  },

  /// Escalation and re-triage only apply to `OPEN`/`IN_REVIEW` reports.
  #[error("report {id} is {status} and no longer active")]
  ReportInactive { id: Uuid, status: ReportStatus },

  #[error("report {id} is already {current}; {requested} is not an escalation")]
  NotAnEscalation {
    id:        Uuid,
    current:   SeverityPriority,
    requested: SeverityPriority,
  },

  /// The report changed status between read and write.
  #[error("report {0} was modified concurrently")]
  StaleReport(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether the caller may reasonably retry the same request.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      Self::RepositoryUnavailable(_) | Self::ConflictRetryExhausted { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
