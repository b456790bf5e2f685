//! [`SqliteStore`], the SQLite implementation of [`ReportRepository`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};
use uuid::Uuid;

use rootcause_core::{
  report::{ReportPatch, RootCauseReport},
  store::{ReportQuery, ReportRepository},
};

use crate::{
  Error, Result,
  encode::{REPORT_COLUMNS, RawReport, ReportRow, encode_enum, encode_uuid},
  schema::SCHEMA,
};

/// How long a write waits on another process's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INSERT_REPORT: &str = "
  INSERT INTO root_cause_reports (
    id, failure_signature, trigger_source, scope_type, scope_id, sd_id,
    problem_statement, observed, expected, status, severity_priority,
    impact_level, likelihood_level, confidence, trigger_tier,
    root_cause_category, recurrence_count, evidence_refs,
    created_at, updated_at, resolved_at
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21)";

/// Rewrites the columns a [`ReportPatch`] can touch.
const UPDATE_REPORT: &str = "
  UPDATE root_cause_reports SET
    status = ?2, severity_priority = ?3, confidence = ?4,
    recurrence_count = ?5, evidence_refs = ?6,
    updated_at = ?7, resolved_at = ?8
  WHERE id = ?1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A report repository backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn busy_timeout_ms(&self) -> Result<i64> {
    Ok(
      self
        .conn
        .call(|conn| Ok(conn.query_row("PRAGMA busy_timeout", [], |r| r.get(0))?))
        .await?,
    )
  }
}

/// Read, check, patch and write back report `id` inside one immediate
/// transaction.
///
/// The outer error is a database failure; the inner one is a decode or
/// precondition failure, which rolls the transaction back on drop.
fn patch_in_tx(
  conn: &mut rusqlite::Connection,
  id: Uuid,
  patch: ReportPatch,
) -> tokio_rusqlite::Result<Result<RootCauseReport>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let raw = tx
    .query_row(
      &format!("SELECT {REPORT_COLUMNS} FROM root_cause_reports WHERE id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawReport::from_row,
    )
    .optional()?;
  let Some(raw) = raw else {
    return Ok(Err(Error::NotFound(id)));
  };

  let mut report = match raw.into_report() {
    Ok(r) => r,
    Err(e) => return Ok(Err(e)),
  };
  if !patch.expect.admits(&report) {
    return Ok(Err(Error::PreconditionFailed(id)));
  }
  patch.apply_to(&mut report, Utc::now());

  let row = match ReportRow::encode(&report) {
    Ok(row) => row,
    Err(e) => return Ok(Err(e)),
  };
  tx.execute(UPDATE_REPORT, &row.update_params()[..])?;
  tx.commit()?;

  Ok(Ok(report))
}

// ─── ReportRepository impl ───────────────────────────────────────────────────

impl ReportRepository for SqliteStore {
  type Error = Error;

  async fn find_active_by_signature(&self, signature: &str) -> Result<Option<RootCauseReport>> {
    let signature = signature.to_owned();

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {REPORT_COLUMNS} FROM root_cause_reports
               WHERE failure_signature = ?1 AND status IN ('OPEN', 'IN_REVIEW')"
            ),
            rusqlite::params![signature],
            RawReport::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn create_report(&self, report: RootCauseReport) -> Result<RootCauseReport> {
    let row = ReportRow::encode(&report)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(INSERT_REPORT, &row.insert_params()[..])?;
        Ok(())
      })
      .await?;

    Ok(report)
  }

  async fn update_report(&self, id: Uuid, patch: ReportPatch) -> Result<RootCauseReport> {
    self
      .conn
      .call(move |conn| patch_in_tx(conn, id, patch))
      .await?
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<RootCauseReport>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM root_cause_reports WHERE id = ?1"),
            rusqlite::params![id_str],
            RawReport::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<RootCauseReport>> {
    // Build WHERE clause and positional bind values together.
    let mut conds: Vec<String> = vec![];
    let mut binds: Vec<Value> = vec![];

    if let Some(sd_id) = &query.sd_id {
      binds.push(Value::Text(sd_id.clone()));
      conds.push(format!("sd_id = ?{}", binds.len()));
    }
    for (column, values) in [
      ("status", query.statuses.iter().map(|s| encode_enum(*s)).collect::<Vec<_>>()),
      (
        "severity_priority",
        query.severities.iter().map(|p| encode_enum(*p)).collect(),
      ),
    ] {
      if values.is_empty() {
        continue;
      }
      let mut slots = Vec::with_capacity(values.len());
      for v in values {
        binds.push(Value::Text(v.to_owned()));
        slots.push(format!("?{}", binds.len()));
      }
      conds.push(format!("{column} IN ({})", slots.join(", ")));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let limit = query.limit.unwrap_or(ReportQuery::DEFAULT_LIMIT);
    binds.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    binds.push(Value::Integer(
      i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX),
    ));
    let (limit_slot, offset_slot) = (binds.len() - 1, binds.len());

    let sql = format!(
      "SELECT {REPORT_COLUMNS} FROM root_cause_reports
       {where_clause}
       ORDER BY created_at, rowid
       LIMIT ?{limit_slot} OFFSET ?{offset_slot}"
    );

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(binds), RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }
}
