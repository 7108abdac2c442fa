//! Admin views over users, loans and repayments

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::loan::{ListLoansQuery, LoanResponse};
use crate::report::{
    HistoryFilter, MonthlyRepayments, RepaymentHistoryEntry, RepaymentHistoryQuery, ReportService,
    UserDetails,
};
use crate::repayment::{LoanBalance, RepaymentLedger, RepaymentResponse};

fn id_from(path: Result<Path<Uuid>, PathRejection>, name: &str) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest(format!("{} must be a valid id", name)))
}

/// GET /api/admin/loans - Every loan with repayments and outstanding balance
pub async fn list_loans(
    State(ledger): State<Arc<RepaymentLedger>>,
    _admin: AdminUser,
    Query(query): Query<ListLoansQuery>,
) -> ApiResult<Json<Vec<LoanBalance>>> {
    let status = query.status_filter().map_err(ApiError::BadRequest)?;
    let loans = ledger.loan_overview(status).await?;
    Ok(Json(loans))
}

/// GET /api/admin/repayments - Every repayment
pub async fn list_repayments(
    State(ledger): State<Arc<RepaymentLedger>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<RepaymentResponse>>> {
    let repayments = ledger.list_all_repayments().await?;
    Ok(Json(repayments.into_iter().map(Into::into).collect()))
}

/// GET /api/admin/reports/repayments/history - Repayments with borrower names
pub async fn repayment_history(
    State(reports): State<Arc<ReportService>>,
    _admin: AdminUser,
    Query(query): Query<RepaymentHistoryQuery>,
) -> ApiResult<Json<Vec<RepaymentHistoryEntry>>> {
    let filter = HistoryFilter::try_from(query).map_err(ApiError::BadRequest)?;
    let history = reports.repayment_history(&filter).await?;
    Ok(Json(history))
}

/// GET /api/admin/reports/repayment - Monthly repayment totals
pub async fn monthly_repayments(
    State(reports): State<Arc<ReportService>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<MonthlyRepayments>>> {
    let months = reports.monthly_repayments().await?;
    Ok(Json(months))
}

/// GET /api/admin/users/:user_id/details - A user's loans and totals
pub async fn user_details(
    State(reports): State<Arc<ReportService>>,
    _admin: AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserDetails>> {
    let user_id = id_from(path, "userId")?;
    let details = reports.user_details(user_id).await?;
    Ok(Json(details))
}

/// POST /api/admin/loans/:loan_id/reconcile - Close a loan whose repayments cover it
pub async fn reconcile_loan(
    State(ledger): State<Arc<RepaymentLedger>>,
    AdminUser(admin): AdminUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<LoanResponse>> {
    let loan_id = id_from(path, "loanId")?;

    let loan = ledger.reconcile_loan_status(loan_id).await?;
    tracing::info!(loan_id = %loan_id, admin_id = %admin.user_id, status = %loan.status, "Loan reconciled");

    Ok(Json(LoanResponse::from(&loan)))
}
