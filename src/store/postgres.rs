//! PostgreSQL-backed stores

use async_trait::async_trait;
use sqlx::{Acquire, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{LoanStore, LoanTransaction, RepaymentStore, StoreResult, UserStore};
use crate::db;
use crate::loan::{Loan, LoanStatus};
use crate::models::User;
use crate::repayment::{NewRepayment, Repayment};

/// User lookups over the `users` table
#[derive(Clone)]
pub struct PgUserStore {
    db_pool: PgPool,
}

impl PgUserStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(users)
    }
}

/// Loan store over the `loans` table
#[derive(Clone)]
pub struct PgLoanStore {
    db_pool: PgPool,
}

impl PgLoanStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl LoanStore for PgLoanStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(loan)
    }

    async fn find_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(loans)
    }

    async fn find_all(&self, status: Option<LoanStatus>) -> StoreResult<Vec<Loan>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM loans WHERE 1=1");

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        query_builder.push(" ORDER BY created_at ASC");

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(loans)
    }
}

/// Repayment store over the `repayments` table
#[derive(Clone)]
pub struct PgRepaymentStore {
    db_pool: PgPool,
}

impl PgRepaymentStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RepaymentStore for PgRepaymentStore {
    async fn find_by_loan_ids(&self, loan_ids: &[Uuid]) -> StoreResult<Vec<Repayment>> {
        if loan_ids.is_empty() {
            return Ok(Vec::new());
        }

        let repayments = sqlx::query_as::<_, Repayment>(
            "SELECT * FROM repayments WHERE loan_id = ANY($1) ORDER BY date ASC, seq ASC",
        )
        .bind(loan_ids)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(repayments)
    }

    async fn find_all(&self) -> StoreResult<Vec<Repayment>> {
        let repayments =
            sqlx::query_as::<_, Repayment>("SELECT * FROM repayments ORDER BY date ASC, seq ASC")
                .fetch_all(&self.db_pool)
                .await?;
        Ok(repayments)
    }

    async fn begin_for_loan(&self, loan_id: Uuid) -> StoreResult<Box<dyn LoanTransaction>> {
        let tx = db::begin_loan_transaction(&self.db_pool, loan_id).await?;
        Ok(Box::new(PgLoanTransaction { tx, loan_id }))
    }
}

/// One repayment's worth of work inside a database transaction
struct PgLoanTransaction {
    tx: Transaction<'static, Postgres>,
    loan_id: Uuid,
}

#[async_trait]
impl LoanTransaction for PgLoanTransaction {
    async fn loan(&mut self) -> StoreResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(self.loan_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(loan)
    }

    async fn total_repaid(&mut self) -> StoreResult<f64> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM repayments WHERE loan_id = $1",
        )
        .bind(self.loan_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(total)
    }

    async fn insert_repayment(&mut self, repayment: NewRepayment) -> StoreResult<Repayment> {
        let repayment = sqlx::query_as::<_, Repayment>(
            r#"
            INSERT INTO repayments (id, loan_id, amount, date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, loan_id, amount, date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(repayment.loan_id)
        .bind(repayment.amount)
        .bind(repayment.date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(repayment)
    }

    async fn close_loan(&mut self) -> StoreResult<()> {
        // a savepoint keeps a failed update from aborting the repayment insert
        let mut savepoint = (&mut self.tx).begin().await?;

        let result = sqlx::query("UPDATE loans SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(LoanStatus::Closed)
            .bind(self.loan_id)
            .execute(&mut *savepoint)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                savepoint.commit().await?;
                Ok(())
            }
            Ok(_) => {
                savepoint.rollback().await?;
                Err(sqlx::Error::RowNotFound.into())
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
