//! In-process store used for tests and local runs without a database
//!
//! Every operation yields to the scheduler before touching state, so
//! concurrent callers interleave the way they would against a real database.
//! Clones share the same data and the same per-loan locks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    LoanLocks, LoanStore, LoanTransaction, RepaymentStore, StoreError, StoreResult, UserStore,
};
use crate::loan::{Loan, LoanStatus};
use crate::models::User;
use crate::repayment::{NewRepayment, Repayment};

#[derive(Default)]
struct MemoryState {
    users: RwLock<HashMap<Uuid, User>>,
    loans: RwLock<HashMap<Uuid, Loan>>,
    repayments: RwLock<Vec<Repayment>>,
    fail_loan_closes: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<MemoryState>,
    locks: LoanLocks,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub async fn insert_user(&self, user: User) -> User {
        self.state.users.write().await.insert(user.id, user.clone());
        user
    }

    /// Insert or replace a loan
    pub async fn insert_loan(&self, loan: Loan) -> Loan {
        self.state.loans.write().await.insert(loan.id, loan.clone());
        loan
    }

    /// Fault injection for tests: while set, closing a loan inside a
    /// transaction fails with `StoreError::Unavailable`.
    pub fn set_fail_loan_closes(&self, fail: bool) {
        self.state.fail_loan_closes.store(fail, Ordering::SeqCst);
    }
}

fn sorted_by_date(mut repayments: Vec<Repayment>) -> Vec<Repayment> {
    // stable, so same-instant repayments keep insertion order
    repayments.sort_by_key(|r| r.date);
    repayments
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        tokio::task::yield_now().await;
        Ok(self.state.users.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        tokio::task::yield_now().await;
        let users = self.state.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl LoanStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Loan>> {
        tokio::task::yield_now().await;
        Ok(self.state.loans.read().await.get(&id).cloned())
    }

    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Loan>> {
        tokio::task::yield_now().await;
        let mut loans: Vec<Loan> = self
            .state
            .loans
            .read()
            .await
            .values()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.created_at);
        Ok(loans)
    }

    async fn find_all(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>> {
        tokio::task::yield_now().await;
        let mut loans: Vec<Loan> = self
            .state
            .loans
            .read()
            .await
            .values()
            .filter(|loan| status.map_or(true, |s| loan.status == s))
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.created_at);
        Ok(loans)
    }
}

#[async_trait]
impl RepaymentStore for InMemoryStore {
    async fn find_by_loan_ids(&self, loan_ids: &[Uuid]) -> StoreResult<Vec<Repayment>> {
        tokio::task::yield_now().await;
        let repayments = self
            .state
            .repayments
            .read()
            .await
            .iter()
            .filter(|r| loan_ids.contains(&r.loan_id))
            .cloned()
            .collect();
        Ok(sorted_by_date(repayments))
    }

    async fn find_all(&self) -> StoreResult<Vec<Repayment>> {
        tokio::task::yield_now().await;
        let repayments = self.state.repayments.read().await.clone();
        Ok(sorted_by_date(repayments))
    }

    async fn begin_for_loan(&self, loan_id: Uuid) -> StoreResult<Box<dyn LoanTransaction>> {
        let guard = self.locks.acquire(loan_id).await;
        Ok(Box::new(MemoryLoanTransaction {
            state: self.state.clone(),
            loan_id,
            _guard: guard,
        }))
    }
}

/// Writes apply immediately; the held guard is what keeps other
/// transactions on the same loan out.
struct MemoryLoanTransaction {
    state: Arc<MemoryState>,
    loan_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LoanTransaction for MemoryLoanTransaction {
    async fn loan(&mut self) -> StoreResult<Option<Loan>> {
        tokio::task::yield_now().await;
        Ok(self.state.loans.read().await.get(&self.loan_id).cloned())
    }

    async fn total_repaid(&mut self) -> StoreResult<f64> {
        tokio::task::yield_now().await;
        Ok(self
            .state
            .repayments
            .read()
            .await
            .iter()
            .filter(|r| r.loan_id == self.loan_id)
            .map(|r| r.amount)
            .sum())
    }

    async fn insert_repayment(&mut self, repayment: NewRepayment) -> StoreResult<Repayment> {
        tokio::task::yield_now().await;
        let repayment = Repayment {
            id: Uuid::new_v4(),
            loan_id: repayment.loan_id,
            amount: repayment.amount,
            date: repayment.date,
        };
        self.state.repayments.write().await.push(repayment.clone());
        Ok(repayment)
    }

    async fn close_loan(&mut self) -> StoreResult<()> {
        tokio::task::yield_now().await;
        if self.state.fail_loan_closes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("loan writes disabled".to_string()));
        }

        let mut loans = self.state.loans.write().await;
        let loan = loans
            .get_mut(&self.loan_id)
            .ok_or_else(|| StoreError::NotFound(format!("loan {}", self.loan_id)))?;
        loan.status = LoanStatus::Closed;
        loan.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
