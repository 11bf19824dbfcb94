//! CourseNote server binary.
//!
//! # Responsibility
//! - Resolve runtime configuration from flags and `COURSENOTE_*` env vars.
//! - Initialize file logging, open the database and serve the REST API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use coursenote_core::db::open_db;
use coursenote_core::logging::{default_log_dir, default_log_level, init_logging};
use coursenote_core::{LogNotifier, SubjectMatch};
use coursenote_server::{create_router, AppState};
use log::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "coursenote",
    version,
    about = "Course annotation and reminder server"
)]
struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "COURSENOTE_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// SQLite database file; created and migrated when missing.
    #[arg(long, env = "COURSENOTE_DB_PATH", default_value = "coursenote.sqlite3")]
    db_path: PathBuf,

    /// trace|debug|info|warn|error. Defaults to debug in debug builds.
    #[arg(long, env = "COURSENOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[arg(long, env = "COURSENOTE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// How the `subjectName` list filter compares subjects.
    #[arg(
        long,
        env = "COURSENOTE_SUBJECT_MATCH",
        value_enum,
        default_value_t = SubjectMatchArg::Exact
    )]
    subject_match: SubjectMatchArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SubjectMatchArg {
    Exact,
    Substring,
}

impl From<SubjectMatchArg> for SubjectMatch {
    fn from(value: SubjectMatchArg) -> Self {
        match value {
            SubjectMatchArg::Exact => SubjectMatch::Exact,
            SubjectMatchArg::Substring => SubjectMatch::Substring,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = config
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let log_dir = config.log_dir.clone().unwrap_or_else(default_log_dir);
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| anyhow!("log dir is not valid UTF-8: {}", log_dir.display()))?;
    init_logging(&log_level, log_dir).map_err(|err| anyhow!(err))?;

    let conn = open_db(&config.db_path).context("opening database")?;
    let state = AppState::new(conn, Arc::new(LogNotifier))
        .with_subject_match(config.subject_match.into());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        "event=server_start module=cli status=ok bind={} db_path={} subject_match={:?} version={}",
        config.bind,
        config.db_path.display(),
        config.subject_match,
        coursenote_core::core_version()
    );
    println!("coursenote listening on http://{}", config.bind);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("event=server_stop module=cli status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=signal_listen module=cli status=error error={err}");
    }
}
