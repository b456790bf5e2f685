//! Confidence scoring: how well-evidenced a detection is.
//!
//! Confidence is independent of severity: a critical failure with no logs
//! scores low, a trivial one with a full stack trace scores high.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceRefs;

/// "A trigger fired, but with unknown evidence quality."
const BASE: i64 = 40;
const STACK_TRACE_BONUS: i64 = 20;
const ERROR_MESSAGE_BONUS: i64 = 10;
/// Flat evidence-strength term. Screenshots and structured analysis are not
/// scored separately yet.
const EVIDENCE_STRENGTH_BONUS: i64 = 10;

/// A confidence value in the closed interval [0, 100].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "f64", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
  pub const MAX: Confidence = Confidence(100);
  pub const MIN: Confidence = Confidence(0);

  /// Clamp `raw` into [0, 100].
  pub fn clamped(raw: i64) -> Self { Self(raw.clamp(0, 100) as u8) }

  pub fn value(self) -> u8 { self.0 }
}

impl From<i64> for Confidence {
  fn from(raw: i64) -> Self { Self::clamped(raw) }
}

/// Rounds to the nearest integer before clamping, so `70.0` and `70` agree
/// with the float-valued confidences producers send. `NaN` maps to 0.
impl From<f64> for Confidence {
  fn from(raw: f64) -> Self {
    if raw.is_nan() {
      return Self::MIN;
    }
    Self::clamped(raw.round() as i64)
  }
}

impl From<Confidence> for u8 {
  fn from(c: Confidence) -> Self { c.0 }
}

impl fmt::Display for Confidence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}%", self.0)
  }
}

/// Score `evidence`. The log-quality bonuses are mutually exclusive: a stack
/// trace outranks an error message.
pub fn score(evidence: &EvidenceRefs) -> Confidence {
  let log_quality = if evidence.has_stack_trace() {
    STACK_TRACE_BONUS
  } else if evidence.has_error_message() {
    ERROR_MESSAGE_BONUS
  } else {
    0
  };

  Confidence::clamped(BASE + log_quality + EVIDENCE_STRENGTH_BONUS)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::evidence::{ERROR_MESSAGE, SCREENSHOT_URL, STACK_TRACE};

  fn refs(pairs: &[(&str, serde_json::Value)]) -> EvidenceRefs {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), v.clone()))
      .collect()
  }

  #[test]
  fn empty_evidence_scores_fifty() {
    assert_eq!(score(&EvidenceRefs::new()).value(), 50);
  }

  #[test]
  fn error_message_only_scores_sixty() {
    let e = refs(&[(ERROR_MESSAGE, json!("Authentication failed"))]);
    assert_eq!(score(&e).value(), 60);
  }

  #[test]
  fn stack_trace_outranks_error_message() {
    let trace_only = refs(&[(STACK_TRACE, json!("at main.rs:1"))]);
    let both = refs(&[
      (STACK_TRACE, json!("at main.rs:1")),
      (ERROR_MESSAGE, json!("boom")),
    ]);
    assert_eq!(score(&trace_only).value(), 70);
    assert_eq!(score(&both).value(), 70);
  }

  #[test]
  fn monotone_in_log_quality() {
    let none = score(&EvidenceRefs::new());
    let msg = score(&refs(&[(ERROR_MESSAGE, json!("m"))]));
    let trace = score(&refs(&[(STACK_TRACE, json!("t"))]));
    assert!(trace > msg && msg > none);
  }

  #[test]
  fn screenshots_are_not_scored_separately() {
    let e = refs(&[(SCREENSHOT_URL, json!("a.png"))]);
    assert_eq!(score(&e).value(), 50);
  }

  #[test]
  fn clamping_and_serde_bounds() {
    assert_eq!(Confidence::clamped(-5), Confidence::MIN);
    assert_eq!(Confidence::clamped(250), Confidence::MAX);

    let parsed: Confidence = serde_json::from_value(json!(140)).unwrap();
    assert_eq!(parsed, Confidence::MAX);
    assert_eq!(serde_json::to_value(Confidence::clamped(70)).unwrap(), json!(70));
  }

  #[test]
  fn deserialises_floats_like_integers() {
    let parse = |v| serde_json::from_value::<Confidence>(v).unwrap().value();
    assert_eq!(parse(json!(70.0)), 70);
    assert_eq!(parse(json!(70)), 70);
    assert_eq!(parse(json!(69.6)), 70);
    assert_eq!(parse(json!(150.4)), 100);
    assert_eq!(parse(json!(-3.5)), 0);
  }
}
