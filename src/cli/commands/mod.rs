
use crate::config::{Config, get_config_path, load_config, save_config};
use crate::errors::SessionError;
use crate::session::file::codec::format_timestamp;
use crate::session::{Session, SessionManager};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sessionvault")]
#[command(about = "Server-side session storage with memory and file backends")]
#[command(version)]
pub struct Cli {
    /// Config file (default: $SESSIONVAULT_HOME/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP gateway with periodic sweeping
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Storage backend: memory or file
        #[arg(long)]
        backend: Option<String>,
    },
    /// Delete expired sessions once and print how many were removed
    Sweep,
    /// List stored sessions with their expiry
    List,
    /// Print one stored session
    Show { id: String },
    /// Delete one session
    Delete { id: String },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => get_config_path()?,
            };
            init(&path, force)?;
            println!("Wrote default config to {}", path.display());
        }
        Commands::Serve {
            host,
            port,
            backend,
        } => {
            let mut config = load_config(config_path)?;
            apply_serve_overrides(&mut config, host, port, backend)?;
            serve(config).await?;
        }
        Commands::Sweep => {
            let manager = open_manager(config_path)?;
            let removed = manager.delete_expired_sessions().await?;
            println!("Removed {} expired sessions", removed);
        }
        Commands::List => {
            let manager = open_manager(config_path)?;
            for line in list_sessions(&manager, Utc::now()).await? {
                println!("{}", line);
            }
        }
        Commands::Show { id } => {
            let manager = open_manager(config_path)?;
            let session = manager.peek_session(&id).await?;
            print!("{}", render_session(&session, Utc::now()));
        }
        Commands::Delete { id } => {
            let manager = open_manager(config_path)?;
            manager.delete_session(&id).await?;
            println!("Deleted session {}", id);
        }
    }

    Ok(())
}

fn open_manager(config_path: Option<&std::path::Path>) -> Result<SessionManager> {
    let config = load_config(config_path)?;
    if config.session.backend_kind()? == crate::session::BackendKind::Memory {
        warn!("memory backend holds nothing outside a running server");
    }
    Ok(SessionManager::new(&config.session)?)
}

fn init(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    save_config(&Config::default(), Some(path))
}

fn apply_serve_overrides(
    config: &mut Config,
    host: Option<String>,
    port: Option<u16>,
    backend: Option<String>,
) -> Result<(), SessionError> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(backend) = backend {
        config.session.backend = backend;
    }
    config.validate()
}

async fn serve(config: Config) -> Result<()> {
    let manager = Arc::new(SessionManager::new(&config.session)?);
    let mut running = crate::gateway::start(&config.gateway, manager)
        .await
        .context("Failed to start gateway")?;

    println!("sessionvault listening on http://{}", running.addr);
    info!("gateway running, press Ctrl-C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
        _ = &mut running.server => {
            warn!("HTTP server exited");
        }
    }
    running.shutdown();
    Ok(())
}

/// One line per stored session, sorted by id.
async fn list_sessions(manager: &SessionManager, now: DateTime<Utc>) -> Result<Vec<String>> {
    let mut ids = manager.session_ids().await?;
    ids.sort();

    let mut lines = Vec::with_capacity(ids.len());
    for id in ids {
        let line = match manager.peek_session(&id).await {
            Ok(session) => format!(
                "{}  {}  {}",
                id,
                format_timestamp(session.expires_at()),
                state_label(&session, now)
            ),
            // raced with a delete or sweep
            Err(SessionError::NotFound(_)) => continue,
            Err(e) => format!("{}  unreadable: {}", id, e),
        };
        lines.push(line);
    }
    Ok(lines)
}

fn state_label(session: &Session, now: DateTime<Utc>) -> &'static str {
    if session.is_expired_at(now) {
        "expired"
    } else {
        "live"
    }
}

fn render_session(session: &Session, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "id: {}\nexpiresAt: {} ({})\n",
        session.id(),
        format_timestamp(session.expires_at()),
        state_label(session, now)
    );
    let mut keys: Vec<&String> = session.data().keys().collect();
    keys.sort();
    for key in keys {
        let value = session
            .get(key)
            .and_then(crate::session::Value::to_text)
            .unwrap_or_else(|| "<opaque>".to_string());
        let _ = writeln!(out, "{} = {}", key, value);
    }
    out
}
