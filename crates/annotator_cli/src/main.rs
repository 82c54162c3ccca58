//! Annotation server entry point.
//!
//! # Responsibility
//! - Read settings, start logging and open the database.
//! - Load the spreadsheet on first start, then serve the HTTP API.

use annotator_api::{router, AppState};
use annotator_core::db::open_db;
use annotator_core::{core_version, default_log_level, init_logging, Settings};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "annotator")]
#[command(about = "Annotation backend for NER training data")]
#[command(version)]
struct Cli {
    /// Settings file shared with the annotation UI.
    #[arg(long, default_value = "../Settings.json")]
    settings: PathBuf,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Overrides `PyPort` from the settings file.
    #[arg(long)]
    port: Option<u16>,
    /// One of trace, debug, info, warn, error.
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_file(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;

    let level = cli
        .log_level
        .clone()
        .or_else(|| settings.log_level.clone())
        .unwrap_or_else(|| default_log_level().to_string());
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| settings.log_dir.clone())
        .unwrap_or_else(|| PathBuf::from("logs"));
    init_logging(&level, &log_dir).context("failed to initialize logging")?;
    info!(
        "event=app_start module=cli status=ok version={} settings={}",
        core_version(),
        cli.settings.display()
    );

    let db_path = settings.db_path();
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let state = AppState::from_settings(conn, &settings);

    let startup = state.clone();
    match tokio::task::spawn_blocking(move || startup.load_if_missing()).await? {
        Ok(Some(report)) => info!(
            "event=db_autoload module=cli status=ok inserted={}",
            report.inserted
        ),
        Ok(None) => info!("event=db_autoload module=cli status=skipped reason=table_exists"),
        Err(err) => warn!("event=db_autoload module=cli status=error error={err}"),
    }

    let port = cli.port.unwrap_or(settings.port);
    let addr = format!("{}:{}", cli.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("event=server_start module=cli status=ok addr={addr}");

    axum::serve(listener, router(state))
        .await
        .context("server terminated")?;
    Ok(())
}
