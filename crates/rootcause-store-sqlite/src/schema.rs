//! SQL schema for the root cause report store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS root_cause_reports (
    id                  TEXT PRIMARY KEY,
    failure_signature   TEXT NOT NULL,
    trigger_source      TEXT NOT NULL,
    scope_type          TEXT NOT NULL,
    scope_id            TEXT NOT NULL,
    sd_id               TEXT,
    problem_statement   TEXT NOT NULL,
    observed            TEXT NOT NULL DEFAULT 'null',   -- JSON
    expected            TEXT NOT NULL DEFAULT 'null',   -- JSON
    status              TEXT NOT NULL
        CHECK (status IN ('OPEN', 'IN_REVIEW', 'RESOLVED', 'CLOSED')),
    severity_priority   TEXT NOT NULL
        CHECK (severity_priority IN ('P0', 'P1', 'P2', 'P3', 'P4')),
    impact_level        TEXT NOT NULL,
    likelihood_level    TEXT NOT NULL,
    confidence          INTEGER NOT NULL CHECK (confidence BETWEEN 0 AND 100),
    trigger_tier        INTEGER NOT NULL CHECK (trigger_tier BETWEEN 1 AND 4),
    root_cause_category TEXT NOT NULL,
    recurrence_count    INTEGER NOT NULL CHECK (recurrence_count >= 1),
    evidence_refs       TEXT NOT NULL DEFAULT '{}',     -- JSON object
    created_at          TEXT NOT NULL,                  -- RFC 3339, fixed width
    updated_at          TEXT NOT NULL,
    resolved_at         TEXT
);

-- At most one OPEN or IN_REVIEW report per failure signature.
CREATE UNIQUE INDEX IF NOT EXISTS reports_active_signature_idx
    ON root_cause_reports(failure_signature)
    WHERE status IN ('OPEN', 'IN_REVIEW');

CREATE INDEX IF NOT EXISTS reports_sd_idx      ON root_cause_reports(sd_id);
CREATE INDEX IF NOT EXISTS reports_status_idx  ON root_cause_reports(status);
CREATE INDEX IF NOT EXISTS reports_created_idx ON root_cause_reports(created_at);

PRAGMA user_version = 1;
";
