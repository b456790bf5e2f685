//! Tier resolution: how fast a human must look at a trigger.
//!
//! Tiers are categorical (1 = immediate, 4 = backlog). Each source has an
//! ordered rule list; the first rule whose predicate holds wins, and a trigger
//! no rule matches lands in [`Tier::FALLBACK`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trigger::{TriggerContext, TriggerSource, Verdict};

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Urgency tier in {1, 2, 3, 4}.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tier(u8);

impl Tier {
  pub const IMMEDIATE: Tier = Tier(1);
  pub const URGENT: Tier = Tier(2);
  pub const STANDARD: Tier = Tier(3);
  pub const BACKLOG: Tier = Tier(4);

  /// Tier assigned when no rule matches.
  pub const FALLBACK: Tier = Tier::STANDARD;

  pub fn value(self) -> u8 { self.0 }
}

/// Rejected tier value.
#[derive(Debug, thiserror::Error)]
#[error("tier must be between 1 and 4, got {0}")]
pub struct InvalidTier(pub u8);

impl TryFrom<u8> for Tier {
  type Error = InvalidTier;

  fn try_from(v: u8) -> Result<Self, Self::Error> {
    match v {
      1..=4 => Ok(Tier(v)),
      other => Err(InvalidTier(other)),
    }
  }
}

impl From<Tier> for u8 {
  fn from(t: Tier) -> Self { t.0 }
}

impl fmt::Display for Tier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "T{}", self.0)
  }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// One entry in the ordered rule list.
pub struct TierRule {
  /// Stable name, used in logs.
  pub name:    &'static str,
  pub source:  TriggerSource,
  pub tier:    Tier,
  pub matches: fn(&TriggerContext) -> bool,
}

impl fmt::Debug for TierRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TierRule")
      .field("name", &self.name)
      .field("source", &self.source)
      .field("tier", &self.tier)
      .finish_non_exhaustive()
  }
}

fn at_least(v: Option<f64>, threshold: f64) -> bool { v.is_some_and(|v| v >= threshold) }

/// Rules in evaluation order. Order within a source is precedence.
pub static RULES: &[TierRule] = &[
  // Human-initiated reports never rise above the backlog tier.
  TierRule {
    name:    "manual_backlog",
    source:  TriggerSource::Manual,
    tier:    Tier::BACKLOG,
    matches: |_| true,
  },
  TierRule {
    name:    "sub_agent_blocked_high_confidence",
    source:  TriggerSource::SubAgent,
    tier:    Tier::IMMEDIATE,
    matches: |c| c.verdict == Some(Verdict::Blocked) && at_least(c.confidence, 90.0),
  },
  TierRule {
    name:    "sub_agent_fail_confident",
    source:  TriggerSource::SubAgent,
    tier:    Tier::URGENT,
    matches: |c| c.verdict == Some(Verdict::Fail) && at_least(c.confidence, 80.0),
  },
  TierRule {
    name:    "quality_gate_below_threshold",
    source:  TriggerSource::QualityGate,
    tier:    Tier::IMMEDIATE,
    matches: |c| c.quality_score.is_some_and(|s| s < 70.0),
  },
  TierRule {
    name:    "quality_gate_score_drop",
    source:  TriggerSource::QualityGate,
    tier:    Tier::STANDARD,
    matches: |c| at_least(c.score_drop, 15.0),
  },
  // A fresh regression is urgent regardless of its severity.
  TierRule {
    name:    "test_recent_regression",
    source:  TriggerSource::TestFailure,
    tier:    Tier::URGENT,
    matches: |c| c.regression_hours.is_some_and(|h| h <= 24.0),
  },
];

/// The first rule for `source` that matches `context`, if any.
pub fn matching_rule(
  source: TriggerSource,
  context: &TriggerContext,
) -> Option<&'static TierRule> {
  RULES
    .iter()
    .filter(|r| r.source == source)
    .find(|r| (r.matches)(context))
}

/// Resolve the urgency tier for a trigger. Total: falls back to
/// [`Tier::FALLBACK`].
pub fn resolve_tier(source: TriggerSource, context: &TriggerContext) -> Tier {
  match matching_rule(source, context) {
    Some(rule) => {
      tracing::debug!(rule = rule.name, tier = %rule.tier, "tier rule matched");
      rule.tier
    }
    None => Tier::FALLBACK,
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  fn ctx() -> TriggerContext { TriggerContext::default() }

  #[test]
  fn manual_is_always_backlog() {
    let loud = TriggerContext {
      verdict:          Some(Verdict::Blocked),
      confidence:       Some(100.0),
      quality_score:    Some(0.0),
      score_drop:       Some(99.0),
      regression_hours: Some(0.0),
    };
    assert_eq!(resolve_tier(TriggerSource::Manual, &loud), Tier::BACKLOG);
    assert_eq!(resolve_tier(TriggerSource::Manual, &ctx()), Tier::BACKLOG);
  }

  #[test]
  fn sub_agent_rules() {
    let blocked = |confidence| TriggerContext {
      verdict: Some(Verdict::Blocked),
      confidence: Some(confidence),
      ..ctx()
    };
    let fail = |confidence| TriggerContext {
      verdict: Some(Verdict::Fail),
      confidence: Some(confidence),
      ..ctx()
    };

    assert_eq!(resolve_tier(TriggerSource::SubAgent, &blocked(95.0)), Tier::IMMEDIATE);
    assert_eq!(resolve_tier(TriggerSource::SubAgent, &blocked(90.0)), Tier::IMMEDIATE);
    // Blocked but unsure: no rule, fallback.
    assert_eq!(resolve_tier(TriggerSource::SubAgent, &blocked(85.0)), Tier::FALLBACK);
    assert_eq!(resolve_tier(TriggerSource::SubAgent, &fail(80.0)), Tier::URGENT);
    assert_eq!(resolve_tier(TriggerSource::SubAgent, &fail(79.9)), Tier::FALLBACK);
    assert_eq!(resolve_tier(TriggerSource::SubAgent, &ctx()), Tier::FALLBACK);
  }

  #[test]
  fn quality_gate_rules_in_order() {
    let low_score = TriggerContext { quality_score: Some(68.0), score_drop: Some(20.0), ..ctx() };
    let drop_only = TriggerContext { quality_score: Some(82.0), score_drop: Some(15.0), ..ctx() };
    let small_drop = TriggerContext { quality_score: Some(82.0), score_drop: Some(5.0), ..ctx() };

    assert_eq!(resolve_tier(TriggerSource::QualityGate, &low_score), Tier::IMMEDIATE);
    assert_eq!(resolve_tier(TriggerSource::QualityGate, &drop_only), Tier::STANDARD);
    assert_eq!(resolve_tier(TriggerSource::QualityGate, &small_drop), Tier::FALLBACK);
    assert_eq!(
      matching_rule(TriggerSource::QualityGate, &drop_only).map(|r| r.name),
      Some("quality_gate_score_drop")
    );
  }

  #[test]
  fn test_failure_recent_regression() {
    let recent = TriggerContext { regression_hours: Some(24.0), ..ctx() };
    let old = TriggerContext { regression_hours: Some(72.0), ..ctx() };
    assert_eq!(resolve_tier(TriggerSource::TestFailure, &recent), Tier::URGENT);
    assert_eq!(resolve_tier(TriggerSource::TestFailure, &old), Tier::FALLBACK);
  }

  #[test]
  fn rules_do_not_leak_across_sources() {
    let blocked = TriggerContext {
      verdict: Some(Verdict::Blocked),
      confidence: Some(99.0),
      ..ctx()
    };
    assert_eq!(resolve_tier(TriggerSource::Pipeline, &blocked), Tier::FALLBACK);
    assert_eq!(resolve_tier(TriggerSource::TestFailure, &blocked), Tier::FALLBACK);
    assert_eq!(resolve_tier(TriggerSource::Unknown, &blocked), Tier::FALLBACK);
  }

  #[test]
  fn every_source_resolves_within_bounds() {
    for source in TriggerSource::iter() {
      let t = resolve_tier(source, &ctx()).value();
      assert!((1..=4).contains(&t));
    }
  }

  #[test]
  fn tier_serde_rejects_out_of_range() {
    assert!(serde_json::from_str::<Tier>("0").is_err());
    assert!(serde_json::from_str::<Tier>("5").is_err());
    assert_eq!(serde_json::from_str::<Tier>("2").unwrap(), Tier::URGENT);
  }
}
