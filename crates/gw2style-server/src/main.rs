//! # gw2style server
//!
//! One process runs both halves of the moderation loop:
//! - REST API (HTTP)
//! - Discord moderation bot (gateway WebSocket), when enabled

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gw2style_api::{build_router, AppState};
use gw2style_common::config::{AppConfig, Mode};
use gw2style_db::Database;
use gw2style_discord::{BotSettings, ModerationBot};
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "gw2style", version, about = "Guild Wars 2 fashion showcase backend")]
struct Cli {
    /// Config file to layer under the environment (without extension)
    #[arg(long, short, env = "GW2STYLE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations, then serve the API and the moderation bot (default)
    Serve,
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = gw2style_common::config::init(cli.config.as_deref())?;

    init_tracing(config.server.mode);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            let db = Database::connect(&config.database).await?;
            db.migrate().await
        }
        Command::Serve => serve(config).await,
    }
}

/// Pretty logs while developing, JSON lines in release mode.
fn init_tracing(mode: Mode) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gw2style=debug,tower_http=debug".into());

    match mode {
        Mode::Release => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        Mode::Debug => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init(),
    }
}

async fn serve(config: &'static AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting gw2style v{}", env!("CARGO_PKG_VERSION"));

    // Connect to the database
    let db = Database::connect(&config.database).await?;

    // Run migrations
    db.migrate().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // === Moderation bot ===
    let bot_task = if config.discord.enabled {
        match BotSettings::from_config(config) {
            Some(settings) => {
                let bot = Arc::new(ModerationBot::new(settings)?);
                Some(tokio::spawn(async move {
                    if let Err(e) = bot.run(shutdown_rx).await {
                        tracing::error!(error = %e, "Moderation bot stopped");
                    }
                }))
            }
            None => {
                tracing::warn!(
                    "Discord is enabled but the bot token or moderation channel is missing; bot not started"
                );
                None
            }
        }
    } else {
        tracing::info!("Discord moderation bot disabled");
        None
    };

    if config.discord.moderation_webhook_url().is_none() {
        tracing::warn!("No moderation webhook configured; new posts will not be announced to moderators");
    }

    // === REST API Server ===
    let state = AppState::new(db, Arc::new(config.clone()))?;
    let router = build_router(state);
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the bot once the HTTP side has drained.
    let _ = shutdown_tx.send(true);
    if let Some(task) = bot_task {
        let _ = task.await;
    }

    tracing::info!("gw2style stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::parse_from(["gw2style"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["gw2style", "--config", "prod", "migrate"]);
        assert_eq!(cli.config.as_deref(), Some("prod"));
        assert!(matches!(cli.command, Some(Command::Migrate)));
    }
}
