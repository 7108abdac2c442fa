//! Unauthenticated service routes

use axum::{routing::get, Router};
use sqlx::PgPool;

use crate::handlers::health;

/// `/` and `/health`; `db_pool` is `None` on the in-memory backend.
pub fn health_routes(db_pool: Option<PgPool>) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .with_state(db_pool)
}
