//! Evidence extraction: normalising source-specific payloads into
//! [`EvidenceRefs`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::trigger::TriggerSource;

// ─── Well-known keys ─────────────────────────────────────────────────────────

pub const STACK_TRACE: &str = "stack_trace";
pub const ERROR_MESSAGE: &str = "error_message";
pub const SCREENSHOT_URL: &str = "screenshot_url";
pub const TEST_FAILURE_ID: &str = "test_failure_id";
pub const SUB_AGENT_RESULT_ID: &str = "sub_agent_result_id";
pub const DETAILED_ANALYSIS: &str = "detailed_analysis";
pub const LOG_URL: &str = "log_url";

// ─── EvidenceRefs ────────────────────────────────────────────────────────────

/// Named diagnostic artifacts attached to a report.
///
/// Only keys relevant to the originating source are present. Absent items are
/// omitted, never stored as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRefs(BTreeMap<String, Value>);

impl EvidenceRefs {
  pub fn new() -> Self { Self::default() }

  /// Insert `value` under `key`. `null` is treated as absence.
  pub fn insert(&mut self, key: impl Into<String>, value: Value) {
    if !value.is_null() {
      self.0.insert(key.into(), value);
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

  pub fn contains(&self, key: &str) -> bool { self.0.contains_key(key) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn has_stack_trace(&self) -> bool { self.contains(STACK_TRACE) }

  pub fn has_error_message(&self) -> bool { self.contains(ERROR_MESSAGE) }

  /// Fold `newer` into `self`: new keys are added and existing keys take the
  /// newer value. Keys only present in `self` are kept.
  pub fn merge(&mut self, newer: EvidenceRefs) {
    self.0.extend(newer.0);
  }
}

impl FromIterator<(String, Value)> for EvidenceRefs {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    let mut refs = Self::new();
    for (k, v) in iter {
      refs.insert(k, v);
    }
    refs
  }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

/// Normalise `raw_payload` for `source` into [`EvidenceRefs`].
///
/// Pure and infallible: missing or mistyped fields are skipped, and sources
/// without an extraction rule yield empty evidence.
pub fn extract_evidence(source: TriggerSource, raw_payload: &Value) -> EvidenceRefs {
  let Some(payload) = raw_payload.as_object() else {
    return EvidenceRefs::new();
  };

  let mut refs = EvidenceRefs::new();
  match source {
    TriggerSource::TestFailure => {
      copy_keys(
        payload,
        &mut refs,
        &[ERROR_MESSAGE, STACK_TRACE, SCREENSHOT_URL, TEST_FAILURE_ID],
      );
    }
    TriggerSource::SubAgent => {
      // `detailed_analysis` is free-form per sub-agent and copied whole.
      copy_keys(
        payload,
        &mut refs,
        &[SUB_AGENT_RESULT_ID, ERROR_MESSAGE, DETAILED_ANALYSIS],
      );
    }
    TriggerSource::Pipeline => {
      copy_keys(payload, &mut refs, &[ERROR_MESSAGE, STACK_TRACE, LOG_URL]);
    }
    TriggerSource::QualityGate
    | TriggerSource::Runtime
    | TriggerSource::HandoffRejection
    | TriggerSource::Manual
    | TriggerSource::Unknown => {}
  }
  refs
}

fn copy_keys(payload: &Map<String, Value>, refs: &mut EvidenceRefs, keys: &[&str]) {
  for key in keys {
    if let Some(value) = payload.get(*key) {
      refs.insert(*key, value.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_failure_copies_known_keys() {
    let payload = json!({
      "error_message": "Expected element to be visible",
      "stack_trace": "Error: Locator timeout\n  at test.ts:42",
      "screenshot_url": "https://example.com/screenshot.png",
      "test_failure_id": "tf-881",
      "retries": 3
    });
    let refs = extract_evidence(TriggerSource::TestFailure, &payload);

    assert_eq!(
      refs.keys().collect::<Vec<_>>(),
      vec![ERROR_MESSAGE, SCREENSHOT_URL, STACK_TRACE, TEST_FAILURE_ID]
    );
    assert_eq!(refs.get(TEST_FAILURE_ID), Some(&json!("tf-881")));
    assert!(!refs.contains("retries"));
  }

  #[test]
  fn pipeline_copies_logs() {
    let payload = json!({
      "error_message": "exit code 137",
      "stack_trace": "OOMKilled",
      "log_url": "https://ci.example.com/runs/9/log",
      "screenshot_url": "https://example.com/unused.png",
      "test_failure_id": "tf-1"
    });
    let refs = extract_evidence(TriggerSource::Pipeline, &payload);

    assert_eq!(
      refs.keys().collect::<Vec<_>>(),
      vec![ERROR_MESSAGE, LOG_URL, STACK_TRACE]
    );
    assert_eq!(refs.get(LOG_URL), Some(&json!("https://ci.example.com/runs/9/log")));
  }

  #[test]
  fn missing_and_null_fields_are_omitted() {
    let payload = json!({ "error_message": null, "stack_trace": "boom" });
    let refs = extract_evidence(TriggerSource::TestFailure, &payload);

    assert_eq!(refs.keys().collect::<Vec<_>>(), vec![STACK_TRACE]);
    let serialised = serde_json::to_value(&refs).unwrap();
    assert_eq!(serialised, json!({ "stack_trace": "boom" }));
  }

  #[test]
  fn sub_agent_copies_result_error_and_analysis() {
    let payload = json!({
      "sub_agent_result_id": "result-123",
      "error_message": "Authentication failed",
      "detailed_analysis": {
        "critical_issues": ["migration fails on clean db"],
        "warnings": []
      },
      "stack_trace": "ignored for sub-agents"
    });
    let refs = extract_evidence(TriggerSource::SubAgent, &payload);

    assert_eq!(
      refs.keys().collect::<Vec<_>>(),
      vec![DETAILED_ANALYSIS, ERROR_MESSAGE, SUB_AGENT_RESULT_ID]
    );
    assert_eq!(refs.get(ERROR_MESSAGE), Some(&json!("Authentication failed")));
    assert!(!refs.has_stack_trace());
  }

  #[test]
  fn sub_agent_analysis_keeps_every_sub_key() {
    let analysis = json!({
      "conflict_detected": true,
      "conflict_type": "SCOPE",
      "cultural_design_style": "minimal"
    });
    let payload = json!({ "detailed_analysis": analysis });
    let refs = extract_evidence(TriggerSource::SubAgent, &payload);

    assert_eq!(refs.get(DETAILED_ANALYSIS), Some(&analysis));

    let nulled = json!({ "detailed_analysis": null });
    assert!(extract_evidence(TriggerSource::SubAgent, &nulled).is_empty());
  }

  #[test]
  fn manual_and_unknown_sources_yield_empty_evidence() {
    let payload = json!({ "stack_trace": "x", "error_message": "y" });
    assert!(extract_evidence(TriggerSource::Manual, &payload).is_empty());
    assert!(extract_evidence(TriggerSource::Unknown, &payload).is_empty());
    assert!(extract_evidence(TriggerSource::Runtime, &payload).is_empty());
    assert!(extract_evidence(TriggerSource::HandoffRejection, &payload).is_empty());
    assert!(extract_evidence(TriggerSource::QualityGate, &payload).is_empty());
  }

  #[test]
  fn non_object_payload_yields_empty_evidence() {
    assert!(extract_evidence(TriggerSource::TestFailure, &Value::Null).is_empty());
    assert!(extract_evidence(TriggerSource::TestFailure, &json!("text")).is_empty());
  }

  #[test]
  fn merge_overwrites_and_keeps() {
    let mut current: EvidenceRefs = [
      (STACK_TRACE.to_owned(), json!("old trace")),
      (SCREENSHOT_URL.to_owned(), json!("a.png")),
    ]
    .into_iter()
    .collect();
    let newer: EvidenceRefs = [
      (STACK_TRACE.to_owned(), json!("new trace")),
      (ERROR_MESSAGE.to_owned(), json!("Authentication failed")),
    ]
    .into_iter()
    .collect();

    current.merge(newer);

    assert_eq!(current.get(STACK_TRACE), Some(&json!("new trace")));
    assert_eq!(current.get(SCREENSHOT_URL), Some(&json!("a.png")));
    assert_eq!(current.get(ERROR_MESSAGE), Some(&json!("Authentication failed")));
  }
}
