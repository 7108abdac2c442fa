//! Loan models for QuickFund
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Active,
    Rejected,
    Closed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Active => "Active",
            LoanStatus::Rejected => "Rejected",
            LoanStatus::Closed => "Closed",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    /// Case-insensitive, so "closed", "Closed" and "CLOSED" are the same state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "active" => Ok(LoanStatus::Active),
            "rejected" => Ok(LoanStatus::Rejected),
            "closed" => Ok(LoanStatus::Closed),
            _ => Err(format!(
                "Invalid loan status: '{}'. Expected: pending, active, rejected or closed",
                s
            )),
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Principal
    pub amount: f64,
    pub purpose: String,
    /// Term in months
    pub duration: i32,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// A freshly applied-for loan. Intake itself lives outside this service;
    /// this is used to seed stores.
    pub fn new(user_id: Uuid, amount: f64, purpose: impl Into<String>, duration: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            amount,
            purpose: purpose.into(),
            duration,
            status: LoanStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: LoanStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.status == LoanStatus::Closed
    }
}

/// Loan as returned over the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub purpose: String,
    pub duration: i32,
    pub status: LoanStatus,
}

impl From<&Loan> for LoanResponse {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            user_id: loan.user_id,
            amount: loan.amount,
            purpose: loan.purpose.clone(),
            duration: loan.duration,
            status: loan.status,
        }
    }
}

/// Query for listing loans
#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    pub status: Option<String>,
}

impl ListLoansQuery {
    pub fn status_filter(&self) -> Result<Option<LoanStatus>, String> {
        self.status.as_deref().map(str::parse).transpose()
    }
}
