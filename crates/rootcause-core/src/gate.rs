//! Handoff gate: whether a governance record may move on while failures
//! against it are still open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::{
  report::{ReportStatus, RootCauseReport},
  severity::SeverityPriority,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
  Pass,
  Blocked,
}

/// An active report that holds the gate closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingReport {
  pub id:                Uuid,
  pub severity:          SeverityPriority,
  pub status:            ReportStatus,
  pub problem_statement: String,
}

/// Outcome of a gate check for one governance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
  pub sd_id:        String,
  pub status:       GateStatus,
  pub active_count: usize,
  pub p0_count:     usize,
  pub p1_count:     usize,
  pub blocking:     Vec<BlockingReport>,
  pub checked_at:   DateTime<Utc>,
}

impl GateReport {
  pub fn is_blocked(&self) -> bool { self.status == GateStatus::Blocked }
}

/// Evaluate the gate over `reports`. Reports that are not active are ignored,
/// so callers may pass an unfiltered list.
pub fn evaluate(
  sd_id: &str,
  reports: &[RootCauseReport],
  checked_at: DateTime<Utc>,
) -> GateReport {
  let active: Vec<&RootCauseReport> = reports
    .iter()
    .filter(|r| r.status.is_active() && r.sd_id.as_deref() == Some(sd_id))
    .collect();

  let count = |p: SeverityPriority| active.iter().filter(|r| r.severity_priority == p).count();

  let blocking: Vec<BlockingReport> = active
    .iter()
    .filter(|r| r.severity_priority.is_blocking())
    .map(|r| BlockingReport {
      id:                r.id,
      severity:          r.severity_priority,
      status:            r.status,
      problem_statement: r.problem_statement.clone(),
    })
    .collect();

  GateReport {
    sd_id: sd_id.to_owned(),
    status: if blocking.is_empty() { GateStatus::Pass } else { GateStatus::Blocked },
    active_count: active.len(),
    p0_count: count(SeverityPriority::P0),
    p1_count: count(SeverityPriority::P1),
    blocking,
    checked_at,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::fixtures::report;

  #[test]
  fn no_reports_passes() {
    let g = evaluate("SD-1", &[], Utc::now());
    assert_eq!(g.status, GateStatus::Pass);
    assert_eq!(g.active_count, 0);
    assert!(g.blocking.is_empty());
  }

  #[test]
  fn low_severity_reports_do_not_block() {
    let reports = [
      report(ReportStatus::Open, SeverityPriority::P2),
      report(ReportStatus::InReview, SeverityPriority::P3),
    ];
    let g = evaluate("SD-1", &reports, Utc::now());
    assert_eq!(g.status, GateStatus::Pass);
    assert_eq!(g.active_count, 2);
  }

  #[test]
  fn active_p0_blocks_with_details() {
    let mut p0 = report(ReportStatus::Open, SeverityPriority::P0);
    p0.problem_statement = "Quality score dropped below 70".into();
    let reports = [
      p0.clone(),
      report(ReportStatus::InReview, SeverityPriority::P1),
      report(ReportStatus::Open, SeverityPriority::P4),
    ];

    let g = evaluate("SD-1", &reports, Utc::now());
    assert!(g.is_blocked());
    assert_eq!((g.p0_count, g.p1_count, g.active_count), (1, 1, 3));
    assert_eq!(g.blocking.len(), 2);
    assert_eq!(g.blocking[0].id, p0.id);
    assert_eq!(g.blocking[0].problem_statement, "Quality score dropped below 70");
  }

  #[test]
  fn resolved_and_foreign_reports_are_ignored() {
    let mut foreign = report(ReportStatus::Open, SeverityPriority::P0);
    foreign.sd_id = Some("SD-2".into());
    let reports = [
      report(ReportStatus::Resolved, SeverityPriority::P0),
      report(ReportStatus::Closed, SeverityPriority::P1),
      foreign,
    ];
    let g = evaluate("SD-1", &reports, Utc::now());
    assert_eq!(g.status, GateStatus::Pass);
    assert_eq!(g.active_count, 0);
  }
}
