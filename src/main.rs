//! QuickFund Backend Server
//!
//! Serves the repayment ledger API: recording repayments, owner loan
//! summaries, and the admin views and reports over users, loans and
//! repayments.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use quickfund_server::auth::AuthService;
use quickfund_server::config::{Config, StorageBackend};
use quickfund_server::db;
use quickfund_server::repayment::RepaymentLedger;
use quickfund_server::report::ReportService;
use quickfund_server::routes;
use quickfund_server::state::AppState;
use quickfund_server::store::{
    InMemoryStore, LoanStore, PgLoanStore, PgRepaymentStore, PgUserStore, RepaymentStore,
    UserStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting QuickFund server");

    let (users, loans, repayments, pool) = match config.storage_backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool).await?;
            let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
            let loans: Arc<dyn LoanStore> = Arc::new(PgLoanStore::new(pool.clone()));
            let repayments: Arc<dyn RepaymentStore> = Arc::new(PgRepaymentStore::new(pool.clone()));
            (users, loans, repayments, Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            let store = InMemoryStore::new();
            let users: Arc<dyn UserStore> = Arc::new(store.clone());
            let loans: Arc<dyn LoanStore> = Arc::new(store.clone());
            let repayments: Arc<dyn RepaymentStore> = Arc::new(store);
            (users, loans, repayments, None)
        }
    };

    let ledger = Arc::new(RepaymentLedger::new(loans.clone(), repayments.clone()));
    let reports = Arc::new(ReportService::new(users, loans, repayments));
    let auth_service = Arc::new(AuthService::new(
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
    ));
    let app_state = AppState::new(ledger, reports, auth_service);

    let app = Router::new()
        .merge(routes::health_routes(pool))
        .merge(routes::app_router(app_state))
        .layer(ServiceBuilder::new().layer(configure_cors(&config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins = config.cors_allowed_origins.as_deref().unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
