//! Deterministic analysis of a report against the report history: similar
//! past failures, contributing factors and the recommendations they imply.
//!
//! Everything here is pure. The engine gathers the history; see
//! [`crate::TriggerEngine::analyze`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::{
  report::{ReportStatus, RootCauseCategory, RootCauseReport},
  tier::Tier,
};

/// Minimum similarity for a historical report to count as the same pattern.
pub const PATTERN_THRESHOLD: u8 = 50;

const CATEGORY_WEIGHT: f64 = 40.0;
const SIGNATURE_WEIGHT: f64 = 40.0;
const SCOPE_WEIGHT: f64 = 20.0;

// ─── Pattern matching ────────────────────────────────────────────────────────

/// A historical report that resembles the one under analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
  pub report_id:  Uuid,
  /// `PAT-<CATEGORY>-<first 8 hex digits of the report id>`.
  pub pattern_id: String,
  /// 0..=100.
  pub similarity: u8,
  pub category:   RootCauseCategory,
  /// The historical report was resolved, so its fix may apply again.
  pub resolved:   bool,
}

fn pattern_id(report: &RootCauseReport) -> String {
  let id = report.id.simple().to_string();
  format!("PAT-{}-{}", report.root_cause_category, &id[..8])
}

fn signature_words(signature: &str) -> BTreeSet<String> {
  signature
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|w| !w.is_empty())
    .map(str::to_lowercase)
    .collect()
}

/// Similarity of `historical` to `report`, in 0..=100.
///
/// A shared category (or `historical` carrying the category `report`'s source
/// would infer) is worth 40, signature word overlap up to 40, and the same
/// scope type 20.
pub fn similarity(report: &RootCauseReport, historical: &RootCauseReport) -> u8 {
  let mut score = 0.0;

  if historical.root_cause_category == report.root_cause_category
    || historical.root_cause_category == RootCauseCategory::infer(report.trigger_source)
  {
    score += CATEGORY_WEIGHT;
  }

  let current = signature_words(&report.failure_signature);
  if !current.is_empty() {
    let past = signature_words(&historical.failure_signature);
    let shared = current.intersection(&past).count() as f64;
    score += (shared / current.len() as f64 * SIGNATURE_WEIGHT).min(SIGNATURE_WEIGHT);
  }

  if historical.scope_type == report.scope_type {
    score += SCOPE_WEIGHT;
  }

  score.round().clamp(0.0, 100.0) as u8
}

/// Historical reports at or above [`PATTERN_THRESHOLD`], most similar first.
/// `report` itself is skipped if it appears in `history`.
pub fn pattern_matches(report: &RootCauseReport, history: &[RootCauseReport]) -> Vec<PatternMatch> {
  let mut matches: Vec<PatternMatch> = history
    .iter()
    .filter(|h| h.id != report.id)
    .filter_map(|h| {
      let similarity = similarity(report, h);
      (similarity >= PATTERN_THRESHOLD).then(|| PatternMatch {
        report_id: h.id,
        pattern_id: pattern_id(h),
        similarity,
        category: h.root_cause_category,
        resolved: h.status == ReportStatus::Resolved,
      })
    })
    .collect();

  matches.sort_by(|a, b| b.similarity.cmp(&a.similarity));
  matches
}

// ─── Contributing factors ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorKind {
  /// Tier 1: the trigger demanded immediate attention.
  CriticalTier,
  /// The failure is scoped to a whole governance record.
  RecordScope,
  RecurringIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
  pub kind:     FactorKind,
  pub weight:   u8,
  pub evidence: String,
}

/// Factors readable off the report itself, heaviest first.
pub fn contributing_factors(report: &RootCauseReport) -> Vec<ContributingFactor> {
  let mut factors = Vec::new();

  if report.trigger_tier == Tier::IMMEDIATE {
    factors.push(ContributingFactor {
      kind:     FactorKind::CriticalTier,
      weight:   25,
      evidence: "T1 trigger indicates a blocking issue".into(),
    });
  }
  if report.scope_type == "SD" {
    factors.push(ContributingFactor {
      kind:     FactorKind::RecordScope,
      weight:   20,
      evidence: "failure at governance-record level affects multiple components".into(),
    });
  }
  if report.recurrence_count > 1 {
    factors.push(ContributingFactor {
      kind:     FactorKind::RecurringIssue,
      weight:   20,
      evidence: format!("issue has occurred {} time(s)", report.recurrence_count),
    });
  }

  factors.sort_by(|a, b| b.weight.cmp(&a.weight));
  factors
}

// ─── Recommendations ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationPriority {
  High,
  Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationKind {
  ImmediateFix,
  TestEnhancement,
  RequirementsUpdate,
  ProcessImprovement,
  InfrastructureFix,
  MonitoringEnhancement,
  DependencyUpdate,
  PatternLearning,
  PatternAlert,
  RegressionPrevention,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
  pub kind:     RecommendationKind,
  pub priority: RecommendationPriority,
  pub action:   String,
}

impl Recommendation {
  fn new(
    kind: RecommendationKind,
    priority: RecommendationPriority,
    action: impl Into<String>,
  ) -> Self {
    Self { kind, priority, action: action.into() }
  }
}

fn category_recommendation(category: RootCauseCategory) -> Option<Recommendation> {
  use RecommendationKind as K;
  use RecommendationPriority::{High, Medium};

  let (kind, priority, action) = match category {
    RootCauseCategory::CodeDefect => {
      (K::ImmediateFix, High, "Review and fix the identified code defect")
    }
    RootCauseCategory::TestCoverageGap => {
      (K::TestEnhancement, High, "Expand test coverage to include the failure scenario")
    }
    RootCauseCategory::RequirementsAmbiguity => (
      K::RequirementsUpdate,
      Medium,
      "Clarify requirements and update acceptance criteria",
    ),
    RootCauseCategory::ProcessGap => (
      K::ProcessImprovement,
      Medium,
      "Update process documentation and add validation checkpoints",
    ),
    RootCauseCategory::Infrastructure => {
      (K::InfrastructureFix, High, "Review and update infrastructure configuration")
    }
    RootCauseCategory::Environmental => {
      (K::MonitoringEnhancement, Medium, "Add environment monitoring and alerting")
    }
    RootCauseCategory::DependencyIssue => {
      (K::DependencyUpdate, High, "Update or isolate the problematic dependency")
    }
    RootCauseCategory::ConfigError | RootCauseCategory::Unknown => return None,
  };
  Some(Recommendation::new(kind, priority, action))
}

/// Recommendations from the category, then past patterns, then the two
/// heaviest contributing factors.
pub fn recommendations(
  category: RootCauseCategory,
  factors: &[ContributingFactor],
  matches: &[PatternMatch],
) -> Vec<Recommendation> {
  let mut recs: Vec<Recommendation> = category_recommendation(category).into_iter().collect();

  if !matches.is_empty() {
    recs.push(match matches.iter().find(|m| m.resolved) {
      Some(resolved) => Recommendation::new(
        RecommendationKind::PatternLearning,
        RecommendationPriority::Medium,
        format!("Review resolution from similar pattern ({})", resolved.pattern_id),
      ),
      None => Recommendation::new(
        RecommendationKind::PatternAlert,
        RecommendationPriority::High,
        "This is part of an unresolved pattern; prioritize a systemic fix",
      ),
    });
  }

  if factors.iter().take(2).any(|f| f.kind == FactorKind::RecurringIssue) {
    recs.push(Recommendation::new(
      RecommendationKind::RegressionPrevention,
      RecommendationPriority::High,
      "Implement automated regression prevention for this failure type",
    ));
  }

  recs
}

// ─── Analysis ────────────────────────────────────────────────────────────────

/// Full analysis of one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
  pub report_id:            Uuid,
  pub category:             RootCauseCategory,
  pub pattern_matches:      Vec<PatternMatch>,
  pub contributing_factors: Vec<ContributingFactor>,
  pub recommendations:      Vec<Recommendation>,
  pub analyzed_at:          DateTime<Utc>,
}

pub fn analyze(
  report: &RootCauseReport,
  history: &[RootCauseReport],
  analyzed_at: DateTime<Utc>,
) -> Analysis {
  let pattern_matches = pattern_matches(report, history);
  let contributing_factors = contributing_factors(report);
  let recommendations = recommendations(
    report.root_cause_category,
    &contributing_factors,
    &pattern_matches,
  );

  Analysis {
    report_id: report.id,
    category: report.root_cause_category,
    pattern_matches,
    contributing_factors,
    recommendations,
    analyzed_at,
  }
}
