//! profilesync - sign in to your account and keep your profile up to date
//! from the terminal.
//!
//! Each subcommand stands in for one screen of the web client: `login`,
//! `register`, `whoami` (the dashboard), `update` (the profile form) and
//! `logout`.

mod app;
mod console;

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Default log file name when `--log-file` points at a directory
const DEFAULT_LOG_FILE: &str = "profilesync.log";

#[derive(Debug, Parser)]
#[command(name = "profilesync", version, about = "Sign in and edit your profile")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with your email or username
    Login {
        /// Email or username (defaults to the last one used)
        #[arg(short, long)]
        identifier: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in and their profile
    Whoami {
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change profile fields; fields left out keep their current value
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Any other field, as key=value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Show the session state without contacting the server
    Status,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let (dir, name) = if path.is_dir() {
                (path, OsStr::new(DEFAULT_LOG_FILE))
            } else {
                (
                    path.parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .unwrap_or(Path::new(".")),
                    path.file_name().unwrap_or(OsStr::new(DEFAULT_LOG_FILE)),
                )
            };
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    info!(command = ?cli.command, "profilesync starting");

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded; failures already reported to the
/// user come back as `Ok(false)`.
async fn run(command: Command) -> anyhow::Result<bool> {
    let mut app = App::new().await?;

    let ok = match command {
        Command::Login { identifier } => app.login(identifier).await?,
        Command::Register { username, email } => app.register(username, email).await?,
        Command::Logout => {
            app.logout();
            true
        }
        Command::Whoami { json } => app.whoami(json).await?,
        Command::Update {
            username,
            email,
            fields,
        } => {
            let mut patch = profilesync_core::ProfilePatch::new();
            if let Some(username) = username {
                patch.set("username", username);
            }
            if let Some(email) = email {
                patch.set("email", email);
            }
            for (key, value) in fields {
                patch.set(key, value);
            }
            app.update(patch).await?
        }
        Command::Status => {
            app.status();
            true
        }
    };

    app.follow_navigation();
    Ok(ok)
}
