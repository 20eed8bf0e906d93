//! `damwatch` — terminal dashboard for a water-treatment telemetry backend.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive data from
//! `damwatch-core`'s [`ScreenController`](damwatch_core::ScreenController).
//! Screens are navigable via number keys: Live Telemetry and History.
//! `--tv` starts in kiosk mode for wall displays.
//!
//! Logs are written to a file (default `/tmp/damwatch.log`) to avoid
//! corrupting the terminal UI. A background data bridge task forwards
//! session, snapshot, and poll-error changes into the TUI action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and app launch.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use damwatch_config::{Profile, resolve_session_credentials};
use damwatch_core::{ControllerConfig, ScreenController};

use crate::app::App;

/// Terminal dashboard for water-treatment plant telemetry.
#[derive(Parser, Debug)]
#[command(name = "damwatch", version, about)]
struct Cli {
    /// Backend URL (e.g., http://treatment-plant:5100)
    #[arg(short = 'u', long, env = "DAMWATCH_URL")]
    url: Option<String>,

    /// Config profile name (defaults to the file's default profile)
    #[arg(short = 'p', long)]
    profile: Option<String>,

    /// Start in TV mode: dashboard only, no chrome, periodic reload
    #[arg(long)]
    tv: bool,

    /// Log file path (defaults to /tmp/damwatch.log)
    #[arg(long, default_value = "/tmp/damwatch.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. Returns a guard that must be held for the
/// lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("damwatch_tui={log_level}")));

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("damwatch.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Build the controller config. Priority: `--url` flag, then the config
/// file profile, then the localhost default.
fn build_config(cli: &Cli) -> Result<ControllerConfig> {
    if let Some(url_str) = cli.url.as_deref() {
        let url = url_str
            .parse()
            .wrap_err_with(|| format!("invalid backend URL: {url_str}"))?;
        // Env / keyring credentials still apply when the URL comes from
        // the command line.
        let credentials = resolve_session_credentials(&Profile::default(), "default");
        return Ok(ControllerConfig {
            url,
            credentials,
            ..ControllerConfig::default()
        });
    }

    let config = damwatch_config::load_config_or_default();
    match config.profile(cli.profile.as_deref()) {
        Ok((name, profile)) => damwatch_config::profile_to_controller_config(profile, name)
            .wrap_err_with(|| format!("profile '{name}' is invalid")),
        Err(err) => {
            // An explicitly requested profile must exist; the implicit
            // default falls back to localhost.
            if cli.profile.is_some() {
                Err(err.into())
            } else {
                Ok(ControllerConfig {
                    credentials: resolve_session_credentials(&Profile::default(), "default"),
                    ..ControllerConfig::default()
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file — hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let config = build_config(&cli)?;
    info!(url = %config.url, tv = cli.tv, "starting damwatch");

    let controller = ScreenController::new(config)?;
    let mut app = App::new(controller, cli.tv);
    app.run().await?;

    Ok(())
}
