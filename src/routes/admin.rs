//! Admin route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users/:user_id/details", get(admin::user_details))
        .route("/api/admin/loans", get(admin::list_loans))
        .route(
            "/api/admin/loans/:loan_id/reconcile",
            post(admin::reconcile_loan),
        )
        .route("/api/admin/repayments", get(admin::list_repayments))
        .route(
            "/api/admin/reports/repayment",
            get(admin::monthly_repayments),
        )
        .route(
            "/api/admin/reports/repayments/history",
            get(admin::repayment_history),
        )
}
