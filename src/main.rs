use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courseware_api::clock::SystemClock;
use courseware_api::config::{config, AppConfig};
use courseware_api::database::DatabaseManager;
use courseware_api::storage::LocalFileRepository;
use courseware_api::{app, AppState};

#[derive(Parser)]
#[command(name = "courseware-api")]
#[command(about = "Courseware API - users, subjects, courses and course grants")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Apply database migrations and exit")]
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config();
    tracing::info!("Starting Courseware API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(config).await,
    }
}

async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    let store = DatabaseManager::connect(&config.database)
        .await
        .context("failed to open database")?;
    let clock = Arc::new(SystemClock::new(config.clock.tz()));
    let files = Arc::new(LocalFileRepository::from_config(&config.storage));
    let state = AppState::new(config.clone(), store, clock, files);

    if let Some(admin) = &config.security.admin {
        if state.users().ensure_admin(admin).await? {
            tracing::info!("Created admin account {}", admin.email);
        }
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Courseware API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    if config.database.is_memory() {
        tracing::info!("In-memory database needs no migrations");
        return Ok(());
    }
    let mut database = config.database.clone();
    database.run_migrations = true;
    DatabaseManager::connect(&database)
        .await
        .context("failed to migrate database")?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
