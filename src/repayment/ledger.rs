//! Repayment ledger - business rules for recording repayments and closing loans

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::error::RepaymentError;
use super::model::{LoanBalance, LoanSummary, NewRepayment, Repayment};
use crate::loan::{Loan, LoanResponse, LoanStatus};
use crate::models::Actor;
use crate::store::{LoanStore, RepaymentStore};

/// Tolerance for floating-point money comparisons
pub const AMOUNT_EPSILON: f64 = 1e-6;

type LedgerResult<T> = Result<T, RepaymentError>;

/// Records repayments against loans and closes loans once fully repaid.
///
/// Two concurrent repayments against the same loan could otherwise both read
/// the same total, both pass the outstanding check and together overshoot the
/// principal. Every operation that reads a total and then writes runs inside
/// [`RepaymentStore::begin_for_loan`], whose lock belongs to the backing store
/// and so also covers other ledgers and other server processes.
pub struct RepaymentLedger {
    loans: Arc<dyn LoanStore>,
    repayments: Arc<dyn RepaymentStore>,
}

impl RepaymentLedger {
    pub fn new(loans: Arc<dyn LoanStore>, repayments: Arc<dyn RepaymentStore>) -> Self {
        Self { loans, repayments }
    }

    /// Record a repayment of `amount` against `loan_id` on behalf of `actor`.
    ///
    /// Checks run in order and the first failure wins: amount is a positive
    /// finite number, the loan exists, the actor owns it or is an admin, the
    /// loan is not closed, and the amount fits in the outstanding balance.
    /// When the new total reaches the principal the loan is closed. A failed
    /// close after the repayment is stored is logged, not returned;
    /// [`RepaymentLedger::reconcile_loan_status`] repairs it.
    pub async fn record_repayment(
        &self,
        actor: &Actor,
        loan_id: Uuid,
        amount: f64,
    ) -> LedgerResult<Repayment> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RepaymentError::InvalidInput(
                "amount must be a positive number".to_string(),
            ));
        }

        let mut tx = self.repayments.begin_for_loan(loan_id).await?;

        let loan = tx.loan().await?.ok_or_else(RepaymentError::loan_not_found)?;

        if !actor.can_act_for(loan.user_id) {
            tracing::warn!(
                loan_id = %loan_id,
                actor_id = %actor.id,
                "Repayment refused: actor is neither owner nor admin"
            );
            return Err(RepaymentError::Forbidden(
                "Not authorized to repay this loan".to_string(),
            ));
        }

        if loan.is_closed() {
            return Err(RepaymentError::already_closed());
        }

        let total_paid = tx.total_repaid().await?;
        let outstanding = loan.amount - total_paid;
        if amount > outstanding + AMOUNT_EPSILON {
            tracing::debug!(
                loan_id = %loan_id,
                amount,
                outstanding,
                "Repayment refused: exceeds outstanding balance"
            );
            return Err(RepaymentError::exceeds_outstanding());
        }

        let repayment = tx
            .insert_repayment(NewRepayment {
                loan_id,
                amount,
                date: Utc::now(),
            })
            .await?;

        let closed = if is_fully_repaid(loan.amount, total_paid + amount) {
            match tx.close_loan().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(
                        loan_id = %loan_id,
                        error = %e,
                        "Loan fully repaid but closing it failed; reconcile to repair"
                    );
                    false
                }
            }
        } else {
            false
        };

        tx.commit().await?;

        tracing::info!(
            repayment_id = %repayment.id,
            loan_id = %loan_id,
            actor_id = %actor.id,
            amount,
            "Repayment recorded"
        );
        if closed {
            tracing::info!(loan_id = %loan_id, "Loan fully repaid and closed");
        }

        Ok(repayment)
    }

    /// Every repayment against loans owned by `actor`, oldest first.
    pub async fn list_repayments_for_owner(&self, actor: &Actor) -> LedgerResult<Vec<Repayment>> {
        let loans = self.loans.find_by_owner(actor.id).await?;
        if loans.is_empty() {
            return Ok(Vec::new());
        }
        let loan_ids: Vec<Uuid> = loans.iter().map(|loan| loan.id).collect();
        Ok(self.repayments.find_by_loan_ids(&loan_ids).await?)
    }

    /// Loans owned by `actor` in any status, with their repayments oldest first.
    pub async fn loan_summary_for_owner(&self, actor: &Actor) -> LedgerResult<LoanSummary> {
        let loans = self.loans.find_by_owner(actor.id).await?;
        let loan_ids: Vec<Uuid> = loans.iter().map(|loan| loan.id).collect();
        let repayments = if loan_ids.is_empty() {
            Vec::new()
        } else {
            self.repayments.find_by_loan_ids(&loan_ids).await?
        };

        Ok(LoanSummary {
            loans: loans.iter().map(LoanResponse::from).collect(),
            repayments: repayments.iter().map(Into::into).collect(),
        })
    }

    /// Balance of a single loan, visible to its owner and to admins.
    pub async fn loan_balance(&self, actor: &Actor, loan_id: Uuid) -> LedgerResult<LoanBalance> {
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(RepaymentError::loan_not_found)?;

        if !actor.can_act_for(loan.user_id) {
            return Err(RepaymentError::Forbidden(
                "Not authorized to view this loan".to_string(),
            ));
        }

        let repayments = self.repayments.find_by_loan_ids(&[loan.id]).await?;
        Ok(LoanBalance::new(&loan, repayments))
    }

    /// Every loan, optionally of one status, with repayments and balance.
    pub async fn loan_overview(&self, status: Option<LoanStatus>) -> LedgerResult<Vec<LoanBalance>> {
        let loans = self.loans.find_all(status).await?;
        self.balances_of(&loans).await
    }

    async fn balances_of(&self, loans: &[Loan]) -> LedgerResult<Vec<LoanBalance>> {
        let loan_ids: Vec<Uuid> = loans.iter().map(|loan| loan.id).collect();
        let repayments = self.repayments.find_by_loan_ids(&loan_ids).await?;
        Ok(LoanBalance::for_loans(loans, repayments))
    }

    /// Every repayment in the system, oldest first.
    pub async fn list_all_repayments(&self) -> LedgerResult<Vec<Repayment>> {
        Ok(self.repayments.find_all().await?)
    }

    /// Close `loan_id` if its repayments already cover the principal.
    ///
    /// Repairs a loan left open because the close after its final repayment
    /// failed. Closed loans and loans still owing are returned as is.
    pub async fn reconcile_loan_status(&self, loan_id: Uuid) -> LedgerResult<Loan> {
        let mut tx = self.repayments.begin_for_loan(loan_id).await?;

        let mut loan = tx.loan().await?.ok_or_else(RepaymentError::loan_not_found)?;
        if loan.is_closed() {
            return Ok(loan);
        }

        let total_paid = tx.total_repaid().await?;
        if is_fully_repaid(loan.amount, total_paid) {
            tx.close_loan().await?;
            tx.commit().await?;
            loan.status = LoanStatus::Closed;
            tracing::info!(loan_id = %loan_id, total_paid, "Reconciled fully repaid loan to closed");
        }

        Ok(loan)
    }
}

fn is_fully_repaid(principal: f64, total_paid: f64) -> bool {
    total_paid >= principal - AMOUNT_EPSILON
}
