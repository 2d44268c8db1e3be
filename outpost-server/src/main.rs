//! Outpost Server
//!
//! A transactional outbox dispatcher: durably enqueued domain events are
//! delivered at-least-once to downstream webhook destinations, with bounded
//! retries and an operator API for manual intervention.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use outpost_core::delivery::WebhookDeliveryClient;
use outpost_core::dispatcher::Dispatcher;
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Outpost - transactional outbox dispatch server
#[derive(Parser, Debug)]
#[command(name = "outpost-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./outpost-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting outpost-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let runtime = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Create application state
    let state = AppState::new(db_pool.clone());

    // Spawn dispatcher workers; they coordinate with the API only through
    // the store's atomic claim, so any number of them is safe.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let store = Arc::new(state.store.clone());
    let client = Arc::new(WebhookDeliveryClient::new(
        runtime.routes.clone(),
        runtime.default_route.clone(),
        runtime.dispatcher.delivery_timeout,
    ));

    let mut workers = Vec::with_capacity(runtime.workers as usize);
    for _ in 0..runtime.workers {
        let dispatcher = Dispatcher::new(
            store.clone(),
            client.clone(),
            runtime.dispatcher.clone(),
            shutdown_rx.clone(),
        );
        workers.push(tokio::spawn(dispatcher.run()));
    }
    tracing::info!("Started {} dispatcher worker(s)", runtime.workers);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", runtime.listen);
    let result = run_server(router, runtime.listen).await;

    // Stop dispatcher workers and wait for in-flight attempts to settle
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
