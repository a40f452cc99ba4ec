use anyhow::Result;
use clap::Parser;
use infrastructure::{SeaOrmAllocationStore, ServerConfig};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loading_server::{AppState, api};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding default.toml and the RUN_MODE overlay
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// API Port (overrides configuration)
    #[arg(long)]
    api_port: Option<u16>,

    /// Apply pending migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,loading_server=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Loading sheet server starting...");

    dotenv::dotenv().ok();
    let mut config = ServerConfig::load(&args.config_dir)?;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(port) = args.api_port {
        config.api.port = port;
    }

    // 1. Connect to Database
    info!("Connecting to database...");
    let db = infrastructure::database::connect(&config.database).await?;

    // 1.1 Run Migrations
    if config.database.run_migrations || args.migrate {
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations applied");
    }

    // 2. Initialize State
    let store = SeaOrmAllocationStore::new(db).with_lock_timeout(config.database.lock_timeout_ms);
    let state = Arc::new(AppState::from_config(store, &config));

    // 3. Start API Server
    let app = api::create_router(state);
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received, draining requests");
}
