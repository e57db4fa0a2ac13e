//! EventPass HTTP server.
//!
//! Event registration and attendance over `PostgreSQL`.

mod config;

use anyhow::Context;
use axum::routing::get;
use config::Config;
use eventpass_core::authz::AuthorizationGuard;
use eventpass_core::environment::{Clock, SystemClock};
use eventpass_core::identity::{IdentityResolver, SignedTokenVerifier, TokenVerifier};
use eventpass_postgres::{PostgresEventRepository, PostgresUserDirectory};
use eventpass_web::{build_router, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "info,eventpass=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is normal outside development.
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EventPass server");
    info!(
        max_connections = config.postgres.max_connections,
        check_in_policy = %config.policy.check_in,
        tiers = ?config.policy.ticket_tiers,
        "Configuration loaded"
    );
    if config.auth.uses_dev_secret() {
        warn!("AUTH_TOKEN_SECRET is not set; using the development secret");
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    eventpass_core::metrics::register_business_metrics();

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await
        .context("failed to connect to PostgreSQL")?;

    let repository = Arc::new(PostgresEventRepository::new(pool.clone()));
    repository.migrate().await.context("failed to run migrations")?;
    info!("Database ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let max_ttl = i64::try_from(config.auth.token_ttl)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .context("AUTH_TOKEN_TTL is out of range")?;
    let verifier: Arc<dyn TokenVerifier> = Arc::new(
        SignedTokenVerifier::new(config.auth.token_secret.clone(), Arc::clone(&clock))
            .with_max_ttl(max_ttl),
    );

    let state = AppState::new(
        repository,
        IdentityResolver::new(verifier, PostgresUserDirectory::new(pool.clone())),
        AuthorizationGuard::default(),
        config.policy.inventory()?,
        config.policy.check_in,
        clock,
    );

    let app = build_router(state).route(
        "/metrics",
        get(move || {
            let metrics = metrics.clone();
            async move { metrics.render() }
        }),
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let drain = Duration::from_secs(config.server.shutdown_timeout);
    if tokio::time::timeout(drain, pool.close()).await.is_err() {
        warn!(timeout_secs = drain.as_secs(), "Timed out closing database pool");
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
