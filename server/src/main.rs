//! sql-switchboard server: registers targets, binds callers to them, executes SQL over HTTP.
//!
//! Run from repo root: `cargo run -p sql-switchboard-server`

use sql_switchboard::{app, AppState, Registry, Settings};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Loads .env first so RUST_LOG from it applies to the subscriber.
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("sql_switchboard=info,tower_http=info")
            }),
        )
        .init();

    let registry = Arc::new(Registry::postgres(settings.connection.clone()));
    let router = app(AppState::new(registry.clone()), settings.body_limit);

    let listener = TcpListener::bind(settings.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    registry.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
