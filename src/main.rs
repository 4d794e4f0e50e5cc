//! RefSync server entry point
//!
//! Run with: cargo run
//! Configuration comes from the environment (REFSYNC_DATA_DIR, REFSYNC_HOST,
//! REFSYNC_PORT) or a local .env file.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use refsync::config::Settings;
use refsync::router::build_router;
use refsync::state::AppState;
use refsync::storage::open_database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env();
    settings.ensure_dirs()?;

    // Log to stdout and to a daily-rolling file in the data directory
    let file_appender = tracing_appender::rolling::daily(settings.logs_dir(), "refsync.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    info!("Starting {}", settings.app_name);
    info!("Data directory: {:?}", settings.data_dir);

    let db = open_database(&settings.database_path())?;

    let addr = SocketAddr::new(settings.host, settings.port);
    let state = Arc::new(AppState::new(settings, db)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("RefSync listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
