//! `rollcall`: command-line client for the rollcall attendance server.
//!
//! # Usage
//!
//! ```text
//! face-matcher | rollcall watch --source classroom-cam
//! rollcall list --date 2026-10-18
//! rollcall export --output attendance.csv
//! rollcall students --csv --output students_list.csv
//! rollcall --url http://10.0.0.5:3001 start --webcam-url http://10.0.0.9:8080/video
//! ```

mod client;
mod export;
mod watch;

use std::{
  fs::File,
  io::{self, BufWriter, Write},
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use rollcall_core::debounce::Debouncer;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:3001";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rollcall", about = "Client for the rollcall attendance server")]
struct Args {
  /// Path to a TOML config file (url, source).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the rollcall server (default: http://localhost:3001).
  #[arg(long, env = "ROLLCALL_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Read recognized names from stdin, one per line, and record attendance.
  Watch {
    /// Source label stored with each record.
    #[arg(long)]
    source: Option<String>,

    /// Batching interval in milliseconds.
    #[arg(long, default_value_t = 500)]
    tick_ms: u64,
  },

  /// Print attendance records, newest first.
  List {
    /// Case-insensitive name substring.
    #[arg(long)]
    name: Option<String>,

    /// Local calendar day, `YYYY-MM-DD`.
    #[arg(long)]
    date: Option<NaiveDate>,
  },

  /// Write attendance records as CSV.
  Export {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    date: Option<NaiveDate>,

    /// Output file (default: stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },

  /// Print registered students.
  Students {
    /// Write the roster as CSV (name, roll_no, photo_url) instead.
    #[arg(long)]
    csv: bool,

    /// Output file for `--csv` (default: stdout).
    #[arg(short, long, value_name = "FILE", requires = "csv")]
    output: Option<PathBuf>,
  },

  /// Start the server-side recognizer.
  Start {
    /// IP webcam stream the recognizer should read instead of a local camera.
    #[arg(long)]
    webcam_url: Option<String>,
  },

  /// Stop the server-side recognizer.
  Stop,

  /// Print server health.
  Health,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:    String,
  #[serde(default)]
  source: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::Watch { source, tick_ms } => {
      let source = source
        .or_else(|| (!file_cfg.source.is_empty()).then(|| file_cfg.source.clone()))
        .unwrap_or_else(|| "cli".to_string());
      run_watch(client, source, Duration::from_millis(tick_ms.max(1))).await
    }
    Command::List { name, date } => {
      let records = client.list_attendance(name.as_deref(), date).await?;
      let mut out = io::stdout().lock();
      for r in &records {
        let at = r.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        writeln!(out, "{at}  {:<24} {:<8} {}", r.name, r.roll_no, r.source)?;
      }
      Ok(())
    }
    Command::Export { name, date, output } => {
      let records = client.list_attendance(name.as_deref(), date).await?;
      write_export(output.as_deref(), "attendance", records.len(), |out| {
        export::write_attendance(out, &records)
      })
    }
    Command::Students { csv: true, output } => {
      let students = client.list_students().await?;
      write_export(output.as_deref(), "students", students.len(), |out| {
        export::write_students(out, &students)
      })
    }
    Command::Students { csv: false, .. } => {
      let students = client.list_students().await?;
      let mut out = io::stdout().lock();
      for s in &students {
        writeln!(out, "{:<24} {:<8} {}", s.name, s.roll_no, s.photo_url.as_deref().unwrap_or("-"))?;
      }
      Ok(())
    }
    Command::Start { webcam_url } => {
      println!("{}", client.start(webcam_url.as_deref()).await?);
      Ok(())
    }
    Command::Stop => {
      println!("{}", client.stop().await?);
      Ok(())
    }
    Command::Health => {
      let health = client.health().await?;
      println!("{}", serde_json::to_string_pretty(&health)?);
      Ok(())
    }
  }
}

/// Run `write` against `path`, or stdout when no path is given.
fn write_export(
  path: Option<&Path>,
  what: &str,
  count: usize,
  write: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> Result<()> {
  match path {
    Some(path) => {
      let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
      write(&mut BufWriter::new(file))?;
      info!(count, path = %path.display(), "exported {what}");
    }
    None => write(&mut io::stdout().lock())?,
  }
  Ok(())
}

// ─── Watch ────────────────────────────────────────────────────────────────────

async fn run_watch(client: ApiClient, source: String, tick: Duration) -> Result<()> {
  // Without a roster, roll numbers are sent blank.
  let roster = match client.list_students().await {
    Ok(students) => students,
    Err(e) => {
      warn!(error = %e, "could not load student roster");
      Vec::new()
    }
  };
  info!(students = roster.len(), %source, "watching stdin for recognized names");

  let debouncer = Arc::new(Debouncer::new(client, source).with_roster(roster));
  let stdin = tokio::io::BufReader::new(tokio::io::stdin());
  let shutdown = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  let summary = watch::run(debouncer, stdin, tick, shutdown).await;
  info!(
    recorded = summary.recorded,
    already = summary.already,
    failed = summary.failed,
    suppressed = summary.suppressed,
    "session ended"
  );
  Ok(())
}
