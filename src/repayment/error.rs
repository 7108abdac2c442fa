use thiserror::Error;

use crate::store::StoreError;

/// Why a ledger operation was refused
#[derive(Error, Debug)]
pub enum RepaymentError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RepaymentError {
    pub fn loan_not_found() -> Self {
        RepaymentError::NotFound("Loan not found".to_string())
    }

    pub fn already_closed() -> Self {
        RepaymentError::Conflict("Loan is already closed".to_string())
    }

    pub fn exceeds_outstanding() -> Self {
        RepaymentError::Conflict("Repayment exceeds outstanding amount".to_string())
    }
}
