//! Repayment handlers for the signed-in user

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::repayment::{
    LoanBalance, LoanSummary, RepaymentLedger, RepaymentRequest, RepaymentResponse,
};

/// Body of `POST /api/users/loans/:loan_id/repayments`
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Option<f64>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn loan_id_from(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("loanId must be a valid id".to_string()))
}

async fn record(
    ledger: &RepaymentLedger,
    user: &AuthenticatedUser,
    request: RepaymentRequest,
) -> ApiResult<(StatusCode, Json<RepaymentResponse>)> {
    request.validate()?;
    let (Some(loan_id), Some(amount)) = (request.loan_id, request.amount) else {
        return Err(ApiError::BadRequest(
            "loanId and amount are required".to_string(),
        ));
    };

    let repayment = ledger
        .record_repayment(&user.actor(), loan_id, amount)
        .await?;

    Ok((StatusCode::CREATED, Json(repayment.into())))
}

/// POST /api/users/repayment - Record a repayment
pub async fn create_repayment(
    State(ledger): State<Arc<RepaymentLedger>>,
    user: AuthenticatedUser,
    payload: Result<Json<RepaymentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RepaymentResponse>)> {
    let request = body(payload)?;
    record(&ledger, &user, request).await
}

/// POST /api/users/loans/:loan_id/repayments - Record a repayment, loan in the path
pub async fn create_repayment_for_loan(
    State(ledger): State<Arc<RepaymentLedger>>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RepaymentResponse>)> {
    let loan_id = loan_id_from(path)?;
    let AmountRequest { amount } = body(payload)?;

    let request = RepaymentRequest {
        loan_id: Some(loan_id),
        amount,
    };
    record(&ledger, &user, request).await
}

/// GET /api/users/repayment - Repayments against the caller's loans
pub async fn list_my_repayments(
    State(ledger): State<Arc<RepaymentLedger>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<RepaymentResponse>>> {
    let repayments = ledger.list_repayments_for_owner(&user.actor()).await?;
    Ok(Json(repayments.into_iter().map(Into::into).collect()))
}

/// GET /api/users/loan-summary - The caller's loans and their repayments
pub async fn get_loan_summary(
    State(ledger): State<Arc<RepaymentLedger>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<LoanSummary>> {
    let summary = ledger.loan_summary_for_owner(&user.actor()).await?;
    Ok(Json(summary))
}

/// GET /api/users/loans/:loan_id/balance - Outstanding balance of one loan
pub async fn get_loan_balance(
    State(ledger): State<Arc<RepaymentLedger>>,
    user: AuthenticatedUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<LoanBalance>> {
    let loan_id = loan_id_from(path)?;
    let balance = ledger.loan_balance(&user.actor(), loan_id).await?;
    Ok(Json(balance))
}
