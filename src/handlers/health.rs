//! Liveness and database health

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::db;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: String,
    pub version: &'static str,
}

/// GET / - Service banner
pub async fn root() -> &'static str {
    "QuickFund API Server"
}

/// GET /health - Reports "in-memory" when no database is configured
pub async fn health_check(State(db_pool): State<Option<PgPool>>) -> Json<HealthResponse> {
    let (status, database) = match db_pool {
        None => ("healthy", "in-memory".to_string()),
        Some(pool) => match db::check_health(&pool).await {
            Ok(()) => ("healthy", "connected".to_string()),
            Err(e) => ("unhealthy", format!("error: {}", e)),
        },
    };

    Json(HealthResponse {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
