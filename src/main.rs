#![allow(dead_code)]

mod app;
mod cli;
mod errors;
mod filter;
mod heat;
mod ignore;
mod layout;
mod renderer;
mod tree;
mod vcs;
mod watcher;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::errors::WatchError;

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging()?;

    let cli = cli::Cli::parse();

    let mut app = match app::App::new(&cli) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("heatwatch: {err:#}");
            if let Some(watch_err) = err.downcast_ref::<WatchError>() {
                tracing::error!(error = %watch_err, "startup failed");
            }
            std::process::exit(1);
        }
    };

    app.run()
}

/// Structured logging to a rotating file -- stdout is owned by the TUI, so
/// diagnostics have nowhere else sensible to go.
fn init_logging() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::temp_dir().join("heatwatch");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "heatwatch.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}
