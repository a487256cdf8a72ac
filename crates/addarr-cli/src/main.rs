mod logging;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use addarr_api::{FetchOptions, Method};
use addarr_core::config::AppConfig;
use addarr_api::types::UpdateCheck;
use addarr_core::notifier::{NotificationKind, UpdateInfo};
use addarr_runtime::{ApplyOutcome, LiveSession, RuntimeError, SessionCommand, WatchExit};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::terminal::TerminalSink;

#[derive(Debug, Parser)]
#[command(name = "addarr", version, about = "Addarr backend address and update notifications")]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `server.origin`.
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the base URL API calls go to.
    Resolve,
    /// Forget the remembered base URL.
    Reset,
    /// Send a request through the resolver and print the response.
    Fetch {
        path: String,
        #[arg(long, default_value = "GET")]
        method: Method,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Run one round of update checks.
    Check,
    /// Keep checking for updates until interrupted.
    Watch,
    /// Install the available update.
    Apply,
    /// Dismiss a pending notification.
    Dismiss {
        #[arg(default_value = "available")]
        kind: NotificationKind,
    },
    /// Show the running and latest versions.
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("addarr: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(origin) = cli.origin {
        config.server.origin = origin;
    }

    let _log_guard = logging::init(&config.logging, cli.log_level.as_deref());
    tracing::debug!(origin = %config.server.origin, "Starting");

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("addarr: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<(), RuntimeError> {
    let session = addarr_runtime::connect(config);

    match command {
        Command::Resolve => {
            println!("{}", session.client().resolver().resolve().await);
        }
        Command::Reset => {
            session.client().resolver().reset()?;
            println!("Base URL reset to {}", config.server.origin);
        }
        Command::Fetch {
            path,
            method,
            body,
            timeout_ms,
        } => {
            let body = body
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .map_err(|e| addarr_api::ApiError::Parse(format!("request body: {e}")))?;
            let options = FetchOptions { method, body };
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(config.resolver_options().request_timeout);
            let resp = session.client().raw(&path, &options, timeout).await?;
            println!("{}", resp.status);
            println!("{}", resp.body);
        }
        Command::Check => {
            let sink = TerminalSink::new(false);
            let applied = session.check_applied(&sink).await;
            let available = session.poll_available(&sink).await;
            if applied.is_none() && available.is_none() {
                println!("No updates.");
            }
        }
        Command::Watch => watch(session, config).await,
        Command::Apply => {
            let sink = TerminalSink::new(false);
            if let ApplyOutcome::Failed(reason) = session.apply_update(&sink).await? {
                tracing::debug!("Apply refused: {reason}");
            }
        }
        Command::Dismiss { kind } => {
            let sink = TerminalSink::new(false);
            let shown = match kind {
                NotificationKind::Available => session.poll_available(&sink).await,
                NotificationKind::Applied => session.check_applied(&sink).await,
            };
            if shown.is_none() || !session.dismiss(kind, &sink).await {
                println!("Nothing to dismiss.");
            }
        }
        Command::Version => {
            let running = session.client().version().await?;
            println!("running {} ({})", running.version, running.commit_hash);
            let check = session.client().check_update().await?;
            println!("{}", latest_line(check));
        }
    }
    Ok(())
}

/// Interactive session loop. An applied update starts a fresh session, the
/// way a page reload would.
async fn watch(mut session: LiveSession, config: &AppConfig) {
    let sink = TerminalSink::new(true);
    let (tx, mut rx) = mpsc::channel(8);

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for command in parse_input(&line) {
                if stdin_tx.send(command).await.is_err() {
                    return;
                }
            }
        }
    });

    let ctrl_c_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_tx.send(SessionCommand::Quit).await;
        }
    });

    loop {
        match session.watch(&sink, &mut rx).await {
            WatchExit::Reload => {
                tracing::info!("Update applied, starting a new session");
                session = addarr_runtime::connect(config);
            }
            WatchExit::Quit => break,
        }
    }
    drop(tx);
}

/// Describe a `check-update` answer the same way notifications judge it.
fn latest_line(check: UpdateCheck) -> String {
    match UpdateInfo::from_check(check) {
        Ok(Some(info)) => format!("latest  {}", info.new_version),
        Ok(None) => "up to date".to_string(),
        Err(e) => format!("update check failed: {e}"),
    }
}

/// Map one line of user input to session commands.
fn parse_input(line: &str) -> Vec<SessionCommand> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("a" | "apply"), None) => vec![SessionCommand::Apply],
        (Some("q" | "quit"), None) => vec![SessionCommand::Quit],
        (Some("d" | "dismiss"), None) => NotificationKind::ALL
            .iter()
            .map(|kind| SessionCommand::Dismiss(*kind))
            .collect(),
        (Some("d" | "dismiss"), Some(kind)) => match kind.parse() {
            Ok(kind) => vec![SessionCommand::Dismiss(kind)],
            Err(e) => {
                eprintln!("{e}");
                Vec::new()
            }
        },
        (None, _) => Vec::new(),
        _ => {
            eprintln!("commands: a (apply), d [available|applied] (dismiss), q (quit)");
            Vec::new()
        }
    }
}
