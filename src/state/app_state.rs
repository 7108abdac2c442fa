//! Application state shared across handlers

use std::sync::Arc;

use crate::auth::AuthService;
use crate::repayment::RepaymentLedger;
use crate::report::ReportService;

use axum::extract::FromRef;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RepaymentLedger>,
    pub reports: Arc<ReportService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        ledger: Arc<RepaymentLedger>,
        reports: Arc<ReportService>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            ledger,
            reports,
            auth_service,
        }
    }
}

impl FromRef<AppState> for Arc<RepaymentLedger> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<ReportService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.reports.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}
