//! `rootcause`: submit failure triggers and manage root cause reports.
//!
//! Every command prints a single JSON document to stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! rootcause submit event.json
//! cat event.json | rootcause submit -
//! rootcause list --sd-id SD-AUTH-001 --status OPEN --status IN_REVIEW
//! rootcause transition <ID> RESOLVED
//! rootcause analyze <ID>
//! rootcause gate-check SD-AUTH-001   # exits 2 when blocked
//! ```

mod settings;

use std::{
  io::{self, Write as _},
  path::{Path, PathBuf},
  process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rootcause_core::{
  TriggerEngine,
  report::ReportStatus,
  severity::SeverityPriority,
  store::ReportQuery,
  trigger::TriggerEvent,
};
use rootcause_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::CliConfig;

/// Exit status of `gate-check` when active P0/P1 reports block the record.
const EXIT_BLOCKED: u8 = 2;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Root-cause trigger and deduplication engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rootcause.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Submit a trigger event read from a JSON file, or `-` for stdin.
  Submit {
    #[arg(value_name = "FILE")]
    file: PathBuf,
  },

  /// Show one report.
  Show { id: Uuid },

  /// List reports, oldest first.
  List {
    #[arg(long)]
    sd_id:    Option<String>,
    /// Repeatable; e.g. `--status OPEN --status IN_REVIEW`.
    #[arg(long)]
    status:   Vec<ReportStatus>,
    /// Repeatable; e.g. `--severity P0 --severity P1`.
    #[arg(long)]
    severity: Vec<SeverityPriority>,
    #[arg(long)]
    limit:    Option<usize>,
    #[arg(long)]
    offset:   Option<usize>,
  },

  /// Move a report to a new status.
  Transition { id: Uuid, status: ReportStatus },

  /// Raise the severity of an active report.
  Escalate { id: Uuid, severity: SeverityPriority },

  /// Recompute the confidence of an active report from its evidence.
  Retriage { id: Uuid },

  /// Check whether active reports block a governance record.
  GateCheck { sd_id: String },

  /// Match a report against past reports and suggest next steps.
  Analyze { id: Uuid },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let engine = TriggerEngine::new(store);

  match cli.command {
    Command::Submit { file } => {
      let event = read_event(&file)?;
      print_json(&engine.submit(event).await?)?;
    }
    Command::Show { id } => print_json(&engine.get_report(id).await?)?,
    Command::List { sd_id, status, severity, limit, offset } => {
      let query = ReportQuery {
        sd_id,
        statuses: status,
        severities: severity,
        limit,
        offset,
      };
      print_json(&engine.list_reports(&query).await?)?;
    }
    Command::Transition { id, status } => {
      print_json(&engine.transition(id, status).await?)?;
    }
    Command::Escalate { id, severity } => {
      print_json(&engine.escalate(id, severity).await?)?;
    }
    Command::Retriage { id } => print_json(&engine.retriage(id).await?)?,
    Command::Analyze { id } => print_json(&engine.analyze(id).await?)?,
    Command::GateCheck { sd_id } => {
      let gate = engine.gate_check(&sd_id).await?;
      print_json(&gate)?;
      if gate.is_blocked() {
        return Ok(ExitCode::from(EXIT_BLOCKED));
      }
    }
  }

  Ok(ExitCode::SUCCESS)
}

/// Parse a trigger event from `path`, or from stdin when `path` is `-`.
fn read_event(path: &Path) -> anyhow::Result<TriggerEvent> {
  let raw = if path.as_os_str() == "-" {
    io::read_to_string(io::stdin()).context("failed to read event from stdin")?
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("failed to read event file {}", path.display()))?
  };
  serde_json::from_str(&raw).context("failed to parse trigger event")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let mut out = io::stdout().lock();
  serde_json::to_writer_pretty(&mut out, value)?;
  writeln!(out)?;
  Ok(())
}
