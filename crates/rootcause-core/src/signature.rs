//! Failure signatures, the deduplication key for reports.
//!
//! A signature is `<source>:<scope_type>:<sha256>` where the digest covers
//! the source, scope, governance record and normalised problem statement.
//! The readable prefix makes signatures greppable; the digest keeps them
//! fixed-length whatever the problem statement holds.

use sha2::{Digest, Sha256};

use crate::trigger::{TriggerSource, ValidatedEvent};

/// Separates digest inputs so `("ab", "c")` and `("a", "bc")` differ.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Trim, case-fold and collapse internal whitespace so cosmetic differences
/// in a problem statement do not fragment its signature.
pub fn normalize_problem_statement(statement: &str) -> String {
  statement
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Compute the failure signature from its constituent fields.
pub fn failure_signature(
  source: TriggerSource,
  scope_type: &str,
  scope_id: &str,
  sd_id: Option<&str>,
  problem_statement: &str,
) -> String {
  let source_name: &'static str = source.into();
  let normalized = normalize_problem_statement(problem_statement);

  let mut hasher = Sha256::new();
  for field in [
    source_name,
    scope_type.trim(),
    scope_id.trim(),
    sd_id.map(str::trim).unwrap_or_default(),
    normalized.as_str(),
  ] {
    hasher.update(field.as_bytes());
    hasher.update([FIELD_SEPARATOR]);
  }
  let digest = hex::encode(hasher.finalize());

  format!(
    "{}:{}:{digest}",
    source_name.to_lowercase(),
    scope_type.trim().to_lowercase(),
  )
}

/// Signature of a validated event.
pub fn signature_of(event: &ValidatedEvent) -> String {
  failure_signature(
    event.source,
    &event.scope_type,
    &event.scope_id,
    event.sd_id.as_deref(),
    &event.problem_statement,
  )
}
