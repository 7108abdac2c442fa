//! Route definitions for the QuickFund API

mod admin;
mod health;
mod user;

use axum::Router;

pub use admin::admin_routes;
pub use health::health_routes;
pub use user::user_routes;

use crate::middleware;
use crate::state::AppState;

/// All API routes with request tracing, bound to `state`
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(user_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
