//! [`TriggerEngine`] turns trigger events into deduplicated reports and
//! drives their explicit lifecycle operations.
//!
//! The engine holds no state of its own. Uniqueness of active signatures is
//! the repository's job; the engine resolves a lost race by retrying the
//! lookup exactly once ("optimistic create, fall back to update").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  analysis::{self, Analysis},
  confidence::{self, Confidence},
  evidence::{EvidenceRefs, extract_evidence},
  gate::{self, GateReport},
  report::{ReportPatch, ReportStatus, RootCauseCategory, RootCauseReport},
  severity::{self, SeverityPriority},
  signature::signature_of,
  store::{ReportQuery, ReportRepository, RepositoryError},
  tier::{self, Tier},
  trigger::{TriggerEvent, ValidatedEvent},
};

/// Extra attempts after a conflicting create or update.
const CONFLICT_RETRIES: usize = 1;

// ─── Results ─────────────────────────────────────────────────────────────────

/// Outcome of [`TriggerEngine::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
  pub report_id:        Uuid,
  pub is_duplicate:     bool,
  pub recurrence_count: u32,
}

/// Scalar attributes derived from a trigger at report creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Triage {
  pub evidence:   EvidenceRefs,
  pub confidence: Confidence,
  pub severity:   SeverityPriority,
  pub tier:       Tier,
  pub category:   RootCauseCategory,
}

/// Run every classifier over `event`. Total and side-effect free.
pub fn triage(event: &ValidatedEvent) -> Triage {
  let evidence = extract_evidence(event.source, &event.raw_payload);
  Triage {
    confidence: confidence::score(&evidence),
    severity: severity::classify(event.impact_level, event.likelihood_level),
    tier: tier::resolve_tier(event.source, &event.context),
    category: RootCauseCategory::infer(event.source),
    evidence,
  }
}

fn open_report(
  event: &ValidatedEvent,
  signature: &str,
  triage: Triage,
  now: DateTime<Utc>,
) -> RootCauseReport {
  RootCauseReport {
    id:                  Uuid::new_v4(),
    failure_signature:   signature.to_owned(),
    trigger_source:      event.source,
    scope_type:          event.scope_type.clone(),
    scope_id:            event.scope_id.clone(),
    sd_id:               event.sd_id.clone(),
    problem_statement:   event.problem_statement.clone(),
    observed:            event.observed.clone(),
    expected:            event.expected.clone(),
    status:              ReportStatus::Open,
    severity_priority:   triage.severity,
    impact_level:        event.impact_level,
    likelihood_level:    event.likelihood_level,
    confidence:          triage.confidence,
    trigger_tier:        triage.tier,
    root_cause_category: triage.category,
    recurrence_count:    1,
    evidence_refs:       triage.evidence,
    created_at:          now,
    updated_at:          now,
    resolved_at:         None,
  }
}

fn unavailable<E: RepositoryError>(e: E) -> Error {
  Error::RepositoryUnavailable(Box::new(e))
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct TriggerEngine<R> {
  repository: R,
}

impl<R: ReportRepository> TriggerEngine<R> {
  pub fn new(repository: R) -> Self { Self { repository } }

  pub fn repository(&self) -> &R { &self.repository }

  /// Fold `event` into the matching active report, or open a new one.
  ///
  /// Severity and confidence of an existing report are never recomputed
  /// here; see [`Self::escalate`] and [`Self::retriage`].
  pub async fn submit(&self, event: TriggerEvent) -> Result<SubmitResult> {
    let event = event.validate()?;
    let signature = signature_of(&event);
    let derived = triage(&event);

    for attempt in 0..=CONFLICT_RETRIES {
      let existing = self
        .repository
        .find_active_by_signature(&signature)
        .await
        .map_err(unavailable)?;

      if let Some(existing) = existing {
        let patch = ReportPatch::recurrence(derived.evidence.clone());
        match self.repository.update_report(existing.id, patch).await {
          Ok(updated) => {
            debug!(
              report_id = %updated.id,
              recurrence_count = updated.recurrence_count,
              "recurrence merged into active report"
            );
            return Ok(SubmitResult {
              report_id:        updated.id,
              is_duplicate:     true,
              recurrence_count: updated.recurrence_count,
            });
          }
          // Resolved or removed between lookup and update.
          Err(e) if e.is_conflict() || e.is_not_found() => {
            warn!(%signature, attempt, error = %e, "active report changed under recurrence");
            continue;
          }
          Err(e) => return Err(unavailable(e)),
        }
      }

      let report = open_report(&event, &signature, derived.clone(), Utc::now());
      match self.repository.create_report(report).await {
        Ok(created) => {
          info!(
            report_id = %created.id,
            %signature,
            severity = %created.severity_priority,
            tier = %created.trigger_tier,
            confidence = %created.confidence,
            "root cause report opened"
          );
          return Ok(SubmitResult {
            report_id:        created.id,
            is_duplicate:     false,
            recurrence_count: created.recurrence_count,
          });
        }
        Err(e) if e.is_conflict() => {
          warn!(%signature, attempt, "concurrent create won the race, retrying as update");
          continue;
        }
        Err(e) => return Err(unavailable(e)),
      }
    }

    Err(Error::ConflictRetryExhausted { signature })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_report(&self, id: Uuid) -> Result<RootCauseReport> {
    self
      .repository
      .get_report(id)
      .await
      .map_err(unavailable)?
      .ok_or(Error::ReportNotFound(id))
  }

  pub async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<RootCauseReport>> {
    self.repository.list_reports(query).await.map_err(unavailable)
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Move report `id` to status `to`.
  pub async fn transition(&self, id: Uuid, to: ReportStatus) -> Result<RootCauseReport> {
    let current = self.get_report(id).await?;
    if !current.status.can_transition_to(to) {
      return Err(Error::InvalidTransition { id, from: current.status, to });
    }

    let updated = self
      .repository
      .update_report(id, ReportPatch::transition(current.status, to))
      .await
      .map_err(|e| patch_error(id, e))?;
    info!(report_id = %id, from = %current.status, to = %to, "report status changed");
    Ok(updated)
  }

  /// Raise the severity of an active report to the more urgent band `to`.
  pub async fn escalate(&self, id: Uuid, to: SeverityPriority) -> Result<RootCauseReport> {
    let current = self.get_active(id).await?;
    if !to.is_more_urgent_than(current.severity_priority) {
      return Err(Error::NotAnEscalation {
        id,
        current: current.severity_priority,
        requested: to,
      });
    }

    let updated = self
      .repository
      .update_report(id, ReportPatch::escalate(to))
      .await
      .map_err(|e| patch_error(id, e))?;
    info!(report_id = %id, from = %current.severity_priority, to = %to, "report escalated");
    Ok(updated)
  }

  /// Recompute the confidence of an active report from its current evidence.
  pub async fn retriage(&self, id: Uuid) -> Result<RootCauseReport> {
    self.get_active(id).await?;
    let updated = self
      .repository
      .update_report(id, ReportPatch::retriage())
      .await
      .map_err(|e| patch_error(id, e))?;
    debug!(report_id = %id, confidence = %updated.confidence, "report re-triaged");
    Ok(updated)
  }

  /// Summarise whether active reports block the governance record `sd_id`.
  pub async fn gate_check(&self, sd_id: &str) -> Result<GateReport> {
    let reports = self.list_reports(&ReportQuery::active_for(sd_id)).await?;
    let report = gate::evaluate(sd_id, &reports, Utc::now());
    if report.is_blocked() {
      info!(sd_id, blocking = report.blocking.len(), "gate blocked");
    }
    Ok(report)
  }

  /// Compare report `id` against every stored report and derive its
  /// contributing factors and recommendations.
  pub async fn analyze(&self, id: Uuid) -> Result<Analysis> {
    let report = self.get_report(id).await?;
    let history = self
      .list_reports(&ReportQuery { limit: Some(usize::MAX), ..ReportQuery::default() })
      .await?;

    let analysis = analysis::analyze(&report, &history, Utc::now());
    debug!(
      report_id = %id,
      patterns = analysis.pattern_matches.len(),
      factors = analysis.contributing_factors.len(),
      "report analysed"
    );
    Ok(analysis)
  }

  async fn get_active(&self, id: Uuid) -> Result<RootCauseReport> {
    let current = self.get_report(id).await?;
    if !current.status.is_active() {
      return Err(Error::ReportInactive { id, status: current.status });
    }
    Ok(current)
  }
}

fn patch_error<E: RepositoryError>(id: Uuid, e: E) -> Error {
  if e.is_conflict() {
    Error::StaleReport(id)
  } else if e.is_not_found() {
    Error::ReportNotFound(id)
  } else {
    unavailable(e)
  }
}
