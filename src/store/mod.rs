//! Storage seams for users, loans and repayments
//!
//! The ledger only talks to these traits. `postgres` is the production
//! backend; `memory` keeps everything in process and backs the tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::loan::{Loan, LoanStatus};
use crate::models::User;
use crate::repayment::{NewRepayment, Repayment};

mod locks;
pub mod memory;
pub mod postgres;

pub use locks::LoanLocks;
pub use memory::InMemoryStore;
pub use postgres::{PgLoanStore, PgRepaymentStore, PgUserStore};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User lookups. Accounts are managed elsewhere.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
}

/// Loan reads
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Loan>>;
    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Loan>>;
    async fn find_all(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>>;
}

/// Repayment persistence. Repayments are append-only and are only written
/// through a [`LoanTransaction`].
#[async_trait]
pub trait RepaymentStore: Send + Sync {
    /// Ordered by date ascending.
    async fn find_by_loan_ids(&self, loan_ids: &[Uuid]) -> StoreResult<Vec<Repayment>>;
    /// Ordered by date ascending.
    async fn find_all(&self) -> StoreResult<Vec<Repayment>>;

    /// Open a unit of work holding the exclusive lock on `loan_id`.
    ///
    /// The lock is shared by every caller of the same backing store, not just
    /// this handle, and is released on commit or drop. Dropping without
    /// committing discards whatever the backend can roll back.
    async fn begin_for_loan(&self, loan_id: Uuid) -> StoreResult<Box<dyn LoanTransaction>>;
}

/// Reads and writes against one locked loan
#[async_trait]
pub trait LoanTransaction: Send {
    async fn loan(&mut self) -> StoreResult<Option<Loan>>;
    async fn total_repaid(&mut self) -> StoreResult<f64>;
    async fn insert_repayment(&mut self, repayment: NewRepayment) -> StoreResult<Repayment>;

    /// Mark the loan Closed. A failure leaves earlier writes in the
    /// transaction intact.
    async fn close_loan(&mut self) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
