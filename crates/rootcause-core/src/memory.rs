//! [`MemoryRepository`], an in-process [`ReportRepository`].
//!
//! Holds every report behind a single mutex, so each operation is trivially
//! atomic. Suitable for tests and for embedding the engine without a
//! database.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  report::{ReportPatch, RootCauseReport},
  store::{ReportQuery, ReportRepository, RepositoryError},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("an active report already carries signature {0}")]
  DuplicateActiveSignature(String),

  #[error("report {0} already exists")]
  DuplicateId(Uuid),

  #[error("report {0} does not satisfy the patch precondition")]
  PreconditionFailed(Uuid),

  #[error("report not found: {0}")]
  NotFound(Uuid),

  #[error("report store lock poisoned")]
  Poisoned,
}

impl RepositoryError for MemoryError {
  fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::DuplicateActiveSignature(_) | Self::DuplicateId(_) | Self::PreconditionFailed(_)
    )
  }

  fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

/// Reports kept in insertion order, which is also creation order.
#[derive(Debug, Default)]
pub struct MemoryRepository {
  reports: Mutex<Vec<RootCauseReport>>,
}

impl MemoryRepository {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> Result<MutexGuard<'_, Vec<RootCauseReport>>, MemoryError> {
    self.reports.lock().map_err(|_| MemoryError::Poisoned)
  }

  /// Number of stored reports, in any status.
  pub fn len(&self) -> usize { self.lock().map(|r| r.len()).unwrap_or_default() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl ReportRepository for MemoryRepository {
  type Error = MemoryError;

  async fn find_active_by_signature(
    &self,
    signature: &str,
  ) -> Result<Option<RootCauseReport>, MemoryError> {
    Ok(
      self
        .lock()?
        .iter()
        .find(|r| r.status.is_active() && r.failure_signature == signature)
        .cloned(),
    )
  }

  async fn create_report(
    &self,
    report: RootCauseReport,
  ) -> Result<RootCauseReport, MemoryError> {
    let mut reports = self.lock()?;
    if reports.iter().any(|r| r.id == report.id) {
      return Err(MemoryError::DuplicateId(report.id));
    }
    if report.status.is_active()
      && reports
        .iter()
        .any(|r| r.status.is_active() && r.failure_signature == report.failure_signature)
    {
      return Err(MemoryError::DuplicateActiveSignature(report.failure_signature));
    }
    reports.push(report.clone());
    Ok(report)
  }

  async fn update_report(
    &self,
    id: Uuid,
    patch: ReportPatch,
  ) -> Result<RootCauseReport, MemoryError> {
    let mut reports = self.lock()?;
    let idx = reports
      .iter()
      .position(|r| r.id == id)
      .ok_or(MemoryError::NotFound(id))?;

    if !patch.expect.admits(&reports[idx]) {
      return Err(MemoryError::PreconditionFailed(id));
    }

    let mut updated = reports[idx].clone();
    patch.apply_to(&mut updated, Utc::now());

    let reactivates = updated.status.is_active() && !reports[idx].status.is_active();
    if reactivates
      && reports.iter().any(|r| {
        r.id != id && r.status.is_active() && r.failure_signature == updated.failure_signature
      })
    {
      return Err(MemoryError::DuplicateActiveSignature(updated.failure_signature));
    }

    reports[idx] = updated.clone();
    Ok(updated)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<RootCauseReport>, MemoryError> {
    Ok(self.lock()?.iter().find(|r| r.id == id).cloned())
  }

  async fn list_reports(
    &self,
    query: &ReportQuery,
  ) -> Result<Vec<RootCauseReport>, MemoryError> {
    Ok(
      self
        .lock()?
        .iter()
        .filter(|r| query.matches(r))
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(ReportQuery::DEFAULT_LIMIT))
        .cloned()
        .collect(),
    )
  }
}
