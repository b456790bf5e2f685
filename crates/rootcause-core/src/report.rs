//! Root Cause Reports, the durable entity, and the patches that mutate
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  confidence::{self, Confidence},
  evidence::EvidenceRefs,
  severity::SeverityPriority,
  tier::Tier,
  trigger::{ImpactLevel, LikelihoodLevel, TriggerSource},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a report.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
  Open,
  InReview,
  Resolved,
  Closed,
}

impl ReportStatus {
  /// Statuses that participate in deduplication.
  pub const ACTIVE: [ReportStatus; 2] = [ReportStatus::Open, ReportStatus::InReview];

  pub fn is_active(self) -> bool { matches!(self, Self::Open | Self::InReview) }

  pub fn is_terminal(self) -> bool { !self.is_active() }

  /// Whether a report may move from `self` to `to`.
  ///
  /// Terminal states have no outgoing edges; a failure that recurs after
  /// resolution opens a new report instead.
  pub fn can_transition_to(self, to: ReportStatus) -> bool {
    use ReportStatus::*;
    matches!(
      (self, to),
      (Open, InReview) | (InReview, Open) | (Open | InReview, Resolved | Closed)
    )
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// Broad class of root cause, used to route remediation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RootCauseCategory {
  CodeDefect,
  ConfigError,
  Infrastructure,
  ProcessGap,
  RequirementsAmbiguity,
  TestCoverageGap,
  DependencyIssue,
  Environmental,
  Unknown,
}

impl RootCauseCategory {
  /// Initial category guess from the trigger source alone.
  pub fn infer(source: TriggerSource) -> Self {
    match source {
      TriggerSource::TestFailure => Self::TestCoverageGap,
      TriggerSource::Pipeline => Self::Infrastructure,
      TriggerSource::QualityGate | TriggerSource::SubAgent => Self::CodeDefect,
      TriggerSource::Runtime => Self::Environmental,
      TriggerSource::HandoffRejection => Self::ProcessGap,
      TriggerSource::Manual | TriggerSource::Unknown => Self::Unknown,
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// One distinct underlying failure and its recurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseReport {
  pub id:                  Uuid,
  /// Dedup key; see [`crate::signature`].
  pub failure_signature:   String,
  pub trigger_source:      TriggerSource,
  pub scope_type:          String,
  pub scope_id:            String,
  pub sd_id:               Option<String>,
  pub problem_statement:   String,
  pub observed:            serde_json::Value,
  pub expected:            serde_json::Value,
  pub status:              ReportStatus,
  /// Fixed at creation; changed only by explicit escalation.
  pub severity_priority:   SeverityPriority,
  pub impact_level:        ImpactLevel,
  pub likelihood_level:    LikelihoodLevel,
  pub confidence:          Confidence,
  pub trigger_tier:        Tier,
  pub root_cause_category: RootCauseCategory,
  /// Number of sightings while active; starts at 1.
  pub recurrence_count:    u32,
  /// Latest evidence snapshot, merged across recurrences.
  pub evidence_refs:       EvidenceRefs,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  pub resolved_at:         Option<DateTime<Utc>>,
}

// ─── Patches ─────────────────────────────────────────────────────────────────

/// Condition a report must satisfy for a patch to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precondition {
  #[default]
  Any,
  /// The report is `OPEN` or `IN_REVIEW`.
  Active,
  /// The report is exactly in this status.
  Status(ReportStatus),
  /// The report is active and its severity is less urgent than this band.
  ActiveBelow(SeverityPriority),
}

impl Precondition {
  pub fn admits(self, report: &RootCauseReport) -> bool {
    match self {
      Self::Any => true,
      Self::Active => report.status.is_active(),
      Self::Status(s) => report.status == s,
      Self::ActiveBelow(p) => {
        report.status.is_active() && p.is_more_urgent_than(report.severity_priority)
      }
    }
  }
}

/// A single atomic modification of a report.
///
/// Repositories check [`ReportPatch::expect`] and apply the patch in one
/// step; a report that fails the precondition is left untouched.
#[derive(Debug, Clone, Default)]
pub struct ReportPatch {
  pub expect:            Precondition,
  /// Increment `recurrence_count` by one.
  pub record_recurrence: bool,
  pub merge_evidence:    Option<EvidenceRefs>,
  pub status:            Option<ReportStatus>,
  pub severity_priority: Option<SeverityPriority>,
  /// Recompute `confidence` from the post-merge evidence.
  pub rescore:           bool,
}

impl ReportPatch {
  /// A duplicate sighting of an active report.
  pub fn recurrence(evidence: EvidenceRefs) -> Self {
    Self {
      expect: Precondition::Active,
      record_recurrence: true,
      merge_evidence: Some(evidence),
      ..Self::default()
    }
  }

  /// Compare-and-set status change.
  pub fn transition(from: ReportStatus, to: ReportStatus) -> Self {
    Self {
      expect: Precondition::Status(from),
      status: Some(to),
      ..Self::default()
    }
  }

  pub fn escalate(to: SeverityPriority) -> Self {
    Self {
      expect: Precondition::ActiveBelow(to),
      severity_priority: Some(to),
      ..Self::default()
    }
  }

  pub fn retriage() -> Self {
    Self {
      expect: Precondition::Active,
      rescore: true,
      ..Self::default()
    }
  }

  /// Apply the patch to `report` in place, stamping `updated_at` with `now`.
  ///
  /// Does not check [`Self::expect`]; callers do that first.
  pub fn apply_to(self, report: &mut RootCauseReport, now: DateTime<Utc>) {
    if let Some(evidence) = self.merge_evidence {
      report.evidence_refs.merge(evidence);
    }
    if self.record_recurrence {
      report.recurrence_count = report.recurrence_count.saturating_add(1);
    }
    if let Some(status) = self.status {
      report.status = status;
      if status == ReportStatus::Resolved {
        report.resolved_at = Some(now);
      }
    }
    if let Some(priority) = self.severity_priority {
      report.severity_priority = priority;
    }
    if self.rescore {
      report.confidence = confidence::score(&report.evidence_refs);
    }
    report.updated_at = now;
  }
}


#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;
  use strum::IntoEnumIterator;

  use super::{fixtures::report, *};
  use crate::evidence::{ERROR_MESSAGE, STACK_TRACE};

  #[test]
  fn transitions() {
    use ReportStatus::*;
    assert!(Open.can_transition_to(InReview));
    assert!(InReview.can_transition_to(Open));
    assert!(Open.can_transition_to(Resolved));
    assert!(InReview.can_transition_to(Closed));
    assert!(!Open.can_transition_to(Open));

    for to in ReportStatus::iter() {
      assert!(!Resolved.can_transition_to(to));
      assert!(!Closed.can_transition_to(to));
    }
  }

  #[test]
  fn category_inference() {
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::TestFailure),
      RootCauseCategory::TestCoverageGap
    );
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::Pipeline),
      RootCauseCategory::Infrastructure
    );
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::SubAgent),
      RootCauseCategory::CodeDefect
    );
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::Runtime),
      RootCauseCategory::Environmental
    );
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::HandoffRejection),
      RootCauseCategory::ProcessGap
    );
    assert_eq!(
      RootCauseCategory::infer(TriggerSource::Manual),
      RootCauseCategory::Unknown
    );
  }

  #[test]
  fn recurrence_patch_bumps_and_merges_but_keeps_severity() {
    let mut r = report(ReportStatus::Open, SeverityPriority::P0);
    let mut evidence = EvidenceRefs::new();
    evidence.insert(ERROR_MESSAGE, json!("Authentication failed"));

    let now = Utc::now();
    ReportPatch::recurrence(evidence).apply_to(&mut r, now);

    assert_eq!(r.recurrence_count, 2);
    assert_eq!(r.evidence_refs.get(ERROR_MESSAGE), Some(&json!("Authentication failed")));
    assert_eq!(r.severity_priority, SeverityPriority::P0);
    assert_eq!(r.confidence.value(), 50);
    assert_eq!(r.updated_at, now);
  }

  #[test]
  fn resolving_stamps_resolved_at() {
    let mut r = report(ReportStatus::InReview, SeverityPriority::P2);
    let now = Utc::now();
    ReportPatch::transition(ReportStatus::InReview, ReportStatus::Resolved).apply_to(&mut r, now);
    assert_eq!(r.status, ReportStatus::Resolved);
    assert_eq!(r.resolved_at, Some(now));
  }

  #[test]
  fn retriage_rescores_from_current_evidence() {
    let mut r = report(ReportStatus::Open, SeverityPriority::P2);
    r.evidence_refs.insert(STACK_TRACE, json!("at lib.rs:10"));
    ReportPatch::retriage().apply_to(&mut r, Utc::now());
    assert_eq!(r.confidence.value(), 70);
  }

  #[test]
  fn preconditions() {
    let open_p2 = report(ReportStatus::Open, SeverityPriority::P2);
    let closed = report(ReportStatus::Closed, SeverityPriority::P2);

    assert!(Precondition::Active.admits(&open_p2));
    assert!(!Precondition::Active.admits(&closed));
    assert!(Precondition::Status(ReportStatus::Open).admits(&open_p2));
    assert!(!Precondition::Status(ReportStatus::InReview).admits(&open_p2));
    assert!(Precondition::ActiveBelow(SeverityPriority::P1).admits(&open_p2));
    assert!(!Precondition::ActiveBelow(SeverityPriority::P2).admits(&open_p2));
    assert!(!Precondition::ActiveBelow(SeverityPriority::P0).admits(&closed));
    assert!(Precondition::Any.admits(&closed));
  }
}
