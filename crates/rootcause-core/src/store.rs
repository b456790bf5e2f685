//! The `ReportRepository` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rootcause-store-sqlite`, or [`crate::memory::MemoryRepository`]). The
//! engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  report::{ReportPatch, ReportStatus, RootCauseReport},
  severity::SeverityPriority,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ReportRepository::list_reports`].
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub sd_id:      Option<String>,
  /// Restrict to these statuses; empty means any.
  pub statuses:   Vec<ReportStatus>,
  /// Restrict to these severities; empty means any.
  pub severities: Vec<SeverityPriority>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}

impl ReportQuery {
  /// Default page size when `limit` is unset.
  pub const DEFAULT_LIMIT: usize = 100;

  /// Active reports for one governance record.
  pub fn active_for(sd_id: impl Into<String>) -> Self {
    Self {
      sd_id: Some(sd_id.into()),
      statuses: ReportStatus::ACTIVE.to_vec(),
      limit: Some(usize::MAX),
      ..Self::default()
    }
  }

  /// Whether `report` passes the filters (ignores paging).
  pub fn matches(&self, report: &RootCauseReport) -> bool {
    self
      .sd_id
      .as_deref()
      .is_none_or(|sd| report.sd_id.as_deref() == Some(sd))
      && (self.statuses.is_empty() || self.statuses.contains(&report.status))
      && (self.severities.is_empty()
        || self.severities.contains(&report.severity_priority))
  }
}

// ─── Error classification ────────────────────────────────────────────────────

/// How the engine tells repository failures apart.
///
/// Anything that is neither a conflict nor a missing report is treated as
/// the repository being unavailable.
pub trait RepositoryError: std::error::Error + Send + Sync + 'static {
  /// A write would violate the active-signature uniqueness invariant, or the
  /// patch precondition no longer held.
  fn is_conflict(&self) -> bool;

  fn is_not_found(&self) -> bool;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable storage for root cause reports.
///
/// Each method is individually atomic. Implementations must guarantee that
/// at most one report per `failure_signature` is `OPEN` or `IN_REVIEW` at
/// any time, rejecting a violating write with a conflict error.
pub trait ReportRepository: Send + Sync {
  type Error: RepositoryError;

  /// The active report carrying `signature`, if any.
  fn find_active_by_signature<'a>(
    &'a self,
    signature: &'a str,
  ) -> impl Future<Output = Result<Option<RootCauseReport>, Self::Error>> + Send + 'a;

  /// Persist a new report. Fails with a conflict if an active report with the
  /// same signature exists.
  fn create_report(
    &self,
    report: RootCauseReport,
  ) -> impl Future<Output = Result<RootCauseReport, Self::Error>> + Send + '_;

  /// Apply `patch` to report `id` atomically and return the updated report.
  ///
  /// Fails with not-found if `id` does not exist, and with a conflict if the
  /// patch precondition does not hold.
  fn update_report(
    &self,
    id: Uuid,
    patch: ReportPatch,
  ) -> impl Future<Output = Result<RootCauseReport, Self::Error>> + Send + '_;

  /// Retrieve a report by id. Returns `None` if not found.
  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RootCauseReport>, Self::Error>> + Send + '_;

  /// Reports matching `query`, oldest first.
  fn list_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<RootCauseReport>, Self::Error>> + Send + 'a;
}
