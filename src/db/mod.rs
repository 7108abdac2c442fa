//! PostgreSQL bootstrap for QuickFund
//!
//! Pool creation, embedded migrations, the `/health` check and the
//! per-loan transaction used to serialize repayments across processes.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;

/// Longest a repayment waits for another one on the same loan.
const LOAN_LOCK_TIMEOUT: &str = "5s";

/// Database bootstrap errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Connect the pool sized by `DB_MAX_CONNECTIONS`
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        url = %config.database_url_masked(),
        max_connections = config.db_max_connections,
        "Connecting to database"
    );

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))
}

/// Apply the loans/repayments schema in `./migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!("Database schema up to date");
    Ok(())
}

pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;
    Ok(())
}

/// Begin a transaction holding the advisory lock for `loan_id`.
///
/// `pg_advisory_xact_lock` is keyed on the loan id, so every connection from
/// every server process queues behind the holder. The lock is released when
/// the transaction commits or rolls back.
pub async fn begin_loan_transaction(
    pool: &PgPool,
    loan_id: Uuid,
) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!("SET LOCAL lock_timeout = '{}'", LOAN_LOCK_TIMEOUT))
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(loan_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
