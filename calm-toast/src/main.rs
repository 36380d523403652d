//! Toast host (calm-toast) - Main entry point
//!
//! Drives a notification manager from the command line: every positional
//! message becomes a toast, each change to the active set is printed to
//! stdout as one JSON line, and the process exits once the set drains or on
//! Ctrl+C / SIGTERM.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use calm_common::config::{LoggingConfig, TomlConfig};
use calm_toast::{NotificationManager, Severity, ToastConfig, ToastRequest};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for calm-toast
#[derive(Parser, Debug)]
#[command(name = "calm-toast")]
#[command(about = "Transient notification manager host")]
#[command(version)]
struct Args {
    /// Messages to show; `title::description` splits title from description
    #[arg(required = true)]
    messages: Vec<String>,

    /// Severity applied to every message (default, success, error, warning)
    #[arg(short, long)]
    severity: Option<String>,

    /// Expiry delay in milliseconds (overrides config file)
    #[arg(long)]
    expiry_ms: Option<u64>,

    /// Maximum simultaneously active toasts (overrides config file)
    #[arg(long)]
    max_active: Option<usize>,

    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dismiss the first toast immediately after enqueueing
    #[arg(long)]
    dismiss_first: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let (toml_config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&toml_config.logging)?;
    info!("Configuration loaded ({:?})", source);

    let mut config = ToastConfig::from(&toml_config.notifications);
    if let Some(expiry_ms) = args.expiry_ms {
        config = config.with_expiry(std::time::Duration::from_millis(expiry_ms));
    }
    if let Some(max_active) = args.max_active {
        config = config.with_max_active(Some(max_active));
    }

    let manager =
        NotificationManager::new(config).context("Failed to initialize notification manager")?;
    info!(
        "Notification manager ready (expiry {:?}, max_active {:?})",
        manager.config().expiry,
        manager.config().max_active
    );

    let mut snapshots = manager.watch();
    let severity = args.severity.as_deref().map(|name| {
        let known = Severity::ALL
            .iter()
            .any(|s| s.as_str().eq_ignore_ascii_case(name.trim()));
        if !known {
            warn!("Unknown severity {:?}, using {}", name, Severity::Default);
        }
        Severity::parse_lossy(name)
    });

    let mut issued = Vec::with_capacity(args.messages.len());
    for message in &args.messages {
        issued.push(manager.enqueue(parse_message(message, severity)));
    }
    if args.dismiss_first {
        if let Some(&first) = issued.first() {
            manager.dismiss(first);
        }
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = snapshots.borrow_and_update().clone();
                println!(
                    "{}",
                    serde_json::to_string(&current).context("Failed to serialize snapshot")?
                );
                if current.is_empty() {
                    info!("All notifications gone");
                    break;
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    manager.shutdown();
    info!("Shutdown complete");
    Ok(())
}

/// Split `title::description`; a message without separator is a title only
fn parse_message(message: &str, severity: Option<Severity>) -> ToastRequest {
    let mut request = match message.split_once("::") {
        Some((title, description)) => ToastRequest::new()
            .title(title.trim())
            .description(description.trim()),
        None => ToastRequest::info(message.trim()),
    };
    request.severity = severity;
    request
}

/// Initialize tracing from the logging config
///
/// `RUST_LOG` wins over the configured level. With a log file configured,
/// output goes to that file instead of stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("calm_toast={0},calm_common={0}", logging.level).into()
    });

    let (file_layer, stderr_layer) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
