//! Encoding and decoding between report types and the plain values stored
//! in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings so that text order is time
//! order. Enums are stored under their `SCREAMING_SNAKE_CASE` names, JSON
//! fields as compact JSON text and UUIDs as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rootcause_core::{
  confidence::Confidence,
  evidence::EvidenceRefs,
  report::RootCauseReport,
  tier::Tier,
};
use uuid::Uuid;

use crate::{Error, Result};

/// Column list shared by every `SELECT`; order matches [`RawReport::from_row`].
pub const REPORT_COLUMNS: &str = "
  id, failure_signature, trigger_source, scope_type, scope_id, sd_id,
  problem_statement, observed, expected, status, severity_priority,
  impact_level, likelihood_level, confidence, trigger_tier,
  root_cause_category, recurrence_count, evidence_refs,
  created_at, updated_at, resolved_at";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Column value of a strum-derived enum.
pub fn encode_enum<T>(value: T) -> &'static str
where
  T: Into<&'static str>,
{
  value.into()
}

fn decode_enum<T: FromStr>(column: &'static str, s: String) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A report encoded for `INSERT` or `UPDATE`, in [`REPORT_COLUMNS`] order.
pub struct ReportRow {
  pub id:                  String,
  pub failure_signature:   String,
  pub trigger_source:      &'static str,
  pub scope_type:          String,
  pub scope_id:            String,
  pub sd_id:               Option<String>,
  pub problem_statement:   String,
  pub observed:            String,
  pub expected:            String,
  pub status:              &'static str,
  pub severity_priority:   &'static str,
  pub impact_level:        &'static str,
  pub likelihood_level:    &'static str,
  pub confidence:          u8,
  pub trigger_tier:        u8,
  pub root_cause_category: &'static str,
  pub recurrence_count:    u32,
  pub evidence_refs:       String,
  pub created_at:          String,
  pub updated_at:          String,
  pub resolved_at:         Option<String>,
}

impl ReportRow {
  pub fn encode(r: &RootCauseReport) -> Result<Self> {
    Ok(Self {
      id:                  encode_uuid(r.id),
      failure_signature:   r.failure_signature.clone(),
      trigger_source:      encode_enum(r.trigger_source),
      scope_type:          r.scope_type.clone(),
      scope_id:            r.scope_id.clone(),
      sd_id:               r.sd_id.clone(),
      problem_statement:   r.problem_statement.clone(),
      observed:            serde_json::to_string(&r.observed)?,
      expected:            serde_json::to_string(&r.expected)?,
      status:              encode_enum(r.status),
      severity_priority:   encode_enum(r.severity_priority),
      impact_level:        encode_enum(r.impact_level),
      likelihood_level:    encode_enum(r.likelihood_level),
      confidence:          r.confidence.value(),
      trigger_tier:        r.trigger_tier.value(),
      root_cause_category: encode_enum(r.root_cause_category),
      recurrence_count:    r.recurrence_count,
      evidence_refs:       serde_json::to_string(&r.evidence_refs)?,
      created_at:          encode_dt(r.created_at),
      updated_at:          encode_dt(r.updated_at),
      resolved_at:         r.resolved_at.map(encode_dt),
    })
  }

  /// Bind values for an `INSERT` listing [`REPORT_COLUMNS`].
  pub fn insert_params(&self) -> [&dyn rusqlite::ToSql; 21] {
    [
      &self.id,
      &self.failure_signature,
      &self.trigger_source,
      &self.scope_type,
      &self.scope_id,
      &self.sd_id,
      &self.problem_statement,
      &self.observed,
      &self.expected,
      &self.status,
      &self.severity_priority,
      &self.impact_level,
      &self.likelihood_level,
      &self.confidence,
      &self.trigger_tier,
      &self.root_cause_category,
      &self.recurrence_count,
      &self.evidence_refs,
      &self.created_at,
      &self.updated_at,
      &self.resolved_at,
    ]
  }

  /// Bind values for an `UPDATE` keyed by `?1 = id`, in the order status,
  /// severity, confidence, recurrence count, evidence, updated, resolved.
  pub fn update_params(&self) -> [&dyn rusqlite::ToSql; 8] {
    [
      &self.id,
      &self.status,
      &self.severity_priority,
      &self.confidence,
      &self.recurrence_count,
      &self.evidence_refs,
      &self.updated_at,
      &self.resolved_at,
    ]
  }
}

/// Raw values read directly from a `root_cause_reports` row.
pub struct RawReport {
  pub id:                  String,
  pub failure_signature:   String,
  pub trigger_source:      String,
  pub scope_type:          String,
  pub scope_id:            String,
  pub sd_id:               Option<String>,
  pub problem_statement:   String,
  pub observed:            String,
  pub expected:            String,
  pub status:              String,
  pub severity_priority:   String,
  pub impact_level:        String,
  pub likelihood_level:    String,
  pub confidence:          i64,
  pub trigger_tier:        i64,
  pub root_cause_category: String,
  pub recurrence_count:    u32,
  pub evidence_refs:       String,
  pub created_at:          String,
  pub updated_at:          String,
  pub resolved_at:         Option<String>,
}

impl RawReport {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      failure_signature:   row.get(1)?,
      trigger_source:      row.get(2)?,
      scope_type:          row.get(3)?,
      scope_id:            row.get(4)?,
      sd_id:               row.get(5)?,
      problem_statement:   row.get(6)?,
      observed:            row.get(7)?,
      expected:            row.get(8)?,
      status:              row.get(9)?,
      severity_priority:   row.get(10)?,
      impact_level:        row.get(11)?,
      likelihood_level:    row.get(12)?,
      confidence:          row.get(13)?,
      trigger_tier:        row.get(14)?,
      root_cause_category: row.get(15)?,
      recurrence_count:    row.get(16)?,
      evidence_refs:       row.get(17)?,
      created_at:          row.get(18)?,
      updated_at:          row.get(19)?,
      resolved_at:         row.get(20)?,
    })
  }

  pub fn into_report(self) -> Result<RootCauseReport> {
    let evidence_refs: EvidenceRefs = serde_json::from_str(&self.evidence_refs)?;
    let trigger_tier = u8::try_from(self.trigger_tier)
      .ok()
      .and_then(|t| Tier::try_from(t).ok())
      .ok_or_else(|| Error::Decode {
        column: "trigger_tier",
        value:  self.trigger_tier.to_string(),
      })?;

    Ok(RootCauseReport {
      id: decode_uuid(&self.id)?,
      failure_signature: self.failure_signature,
      trigger_source: decode_enum("trigger_source", self.trigger_source)?,
      scope_type: self.scope_type,
      scope_id: self.scope_id,
      sd_id: self.sd_id,
      problem_statement: self.problem_statement,
      observed: serde_json::from_str(&self.observed)?,
      expected: serde_json::from_str(&self.expected)?,
      status: decode_enum("status", self.status)?,
      severity_priority: decode_enum("severity_priority", self.severity_priority)?,
      impact_level: decode_enum("impact_level", self.impact_level)?,
      likelihood_level: decode_enum("likelihood_level", self.likelihood_level)?,
      confidence: Confidence::clamped(self.confidence),
      trigger_tier,
      root_cause_category: decode_enum("root_cause_category", self.root_cause_category)?,
      recurrence_count: self.recurrence_count,
      evidence_refs,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      resolved_at: self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
