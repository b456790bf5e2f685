//! Trigger events: the producer-supplied input to the engine.
//!
//! A trigger event is ephemeral: it is never persisted as-is. The engine
//! validates it, derives scalar attributes from it and folds it into a
//! [`RootCauseReport`](crate::report::RootCauseReport).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Which kind of producer emitted the trigger.
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
pub enum TriggerSource {
  SubAgent,
  QualityGate,
  TestFailure,
  /// CI/CD pipeline runs. `CI_PIPELINE` is accepted as an alias.
  #[serde(alias = "CI_PIPELINE")]
  #[strum(to_string = "PIPELINE", serialize = "CI_PIPELINE")]
  Pipeline,
  /// Production runtime monitoring.
  Runtime,
  /// A phase handoff rejected by its validation criteria.
  HandoffRejection,
  Manual,
  /// Any source string this version does not recognise.
  #[serde(other)]
  Unknown,
}

/// Blast radius of the failure.
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
pub enum ImpactLevel {
  Critical,
  High,
  Medium,
  Low,
  #[serde(other)]
  Unknown,
}

/// How often the failure is expected to occur.
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
pub enum LikelihoodLevel {
  Frequent,
  Occasional,
  Rare,
  Unlikely,
  #[serde(other)]
  Unknown,
}

/// Verdict reported by a sub-agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
  Pass,
  ConditionalPass,
  Fail,
  Blocked,
  #[serde(other)]
  Other,
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Contextual signals consulted by the tier resolver.
///
/// Every field is optional; a rule whose signal is absent does not match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerContext {
  /// Sub-agent verdict.
  pub verdict:          Option<Verdict>,
  /// The sub-agent's own confidence in its verdict, 0–100.
  pub confidence:       Option<f64>,
  /// Quality-gate score, 0–100.
  pub quality_score:    Option<f64>,
  /// Drop in quality-gate score relative to the previous evaluation.
  pub score_drop:       Option<f64>,
  /// Hours since the failing test last passed.
  pub regression_hours: Option<f64>,
}

// ─── TriggerEvent ────────────────────────────────────────────────────────────

/// A failure signal as emitted by a producer.
///
/// Required fields are optional here so that a malformed event can be
/// rejected with a precise [`Error::Validation`] rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
  pub source:            Option<TriggerSource>,
  #[serde(default)]
  pub scope_type:        String,
  #[serde(default)]
  pub scope_id:          String,
  /// Governance record this failure relates to. Opaque to the engine.
  pub sd_id:             Option<String>,
  #[serde(default)]
  pub problem_statement: String,
  #[serde(default)]
  pub observed:          serde_json::Value,
  #[serde(default)]
  pub expected:          serde_json::Value,
  /// Source-specific structured data consumed by the evidence extractor.
  #[serde(default)]
  pub raw_payload:       serde_json::Value,
  pub impact_level:      Option<ImpactLevel>,
  pub likelihood_level:  Option<LikelihoodLevel>,
  #[serde(default)]
  pub context:           TriggerContext,
}

impl TriggerEvent {
  /// Convenience constructor with every required field set and all optional
  /// fields empty.
  pub fn new(
    source: TriggerSource,
    scope_type: impl Into<String>,
    scope_id: impl Into<String>,
    impact_level: ImpactLevel,
    likelihood_level: LikelihoodLevel,
  ) -> Self {
    Self {
      source: Some(source),
      scope_type: scope_type.into(),
      scope_id: scope_id.into(),
      impact_level: Some(impact_level),
      likelihood_level: Some(likelihood_level),
      ..Self::default()
    }
  }

  /// Check required fields and produce a [`ValidatedEvent`].
  pub fn validate(self) -> Result<ValidatedEvent> {
    let source = self.source.ok_or(Error::Validation { field: "source" })?;
    if self.scope_type.trim().is_empty() {
      return Err(Error::Validation { field: "scope_type" });
    }
    if self.scope_id.trim().is_empty() {
      return Err(Error::Validation { field: "scope_id" });
    }
    let impact_level = self
      .impact_level
      .ok_or(Error::Validation { field: "impact_level" })?;
    let likelihood_level = self
      .likelihood_level
      .ok_or(Error::Validation { field: "likelihood_level" })?;

    Ok(ValidatedEvent {
      source,
      scope_type: self.scope_type,
      scope_id: self.scope_id,
      sd_id: self.sd_id,
      problem_statement: self.problem_statement,
      observed: self.observed,
      expected: self.expected,
      raw_payload: self.raw_payload,
      impact_level,
      likelihood_level,
      context: self.context,
    })
  }
}

/// A [`TriggerEvent`] whose required fields are known to be present.
#[derive(Debug, Clone)]
pub struct ValidatedEvent {
  pub source:            TriggerSource,
  pub scope_type:        String,
  pub scope_id:          String,
  pub sd_id:             Option<String>,
  pub problem_statement: String,
  pub observed:          serde_json::Value,
  pub expected:          serde_json::Value,
  pub raw_payload:       serde_json::Value,
  pub impact_level:      ImpactLevel,
  pub likelihood_level:  LikelihoodLevel,
  pub context:           TriggerContext,
}
