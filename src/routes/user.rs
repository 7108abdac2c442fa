//! Routes for the signed-in user

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::repayment;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users/repayment",
            get(repayment::list_my_repayments).post(repayment::create_repayment),
        )
        .route("/api/users/loan-summary", get(repayment::get_loan_summary))
        .route(
            "/api/users/loans/:loan_id/repayments",
            post(repayment::create_repayment_for_loan),
        )
        .route(
            "/api/users/loans/:loan_id/balance",
            get(repayment::get_loan_balance),
        )
}
