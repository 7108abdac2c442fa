//! Repayment models and DTOs

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::loan::{Loan, LoanResponse};

/// Repayment model. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Repayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// A repayment about to be stored
#[derive(Debug, Clone)]
pub struct NewRepayment {
    pub loan_id: Uuid,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// Body of a repayment submission. Either field may be missing on the wire;
/// validation turns that into a 400 before the ledger sees it.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentRequest {
    #[validate(required(message = "loanId is required"))]
    pub loan_id: Option<Uuid>,
    #[validate(required(message = "amount is required"))]
    pub amount: Option<f64>,
}

pub(crate) fn iso_millis<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Repayment as returned over the API
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentResponse {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub amount: f64,
    #[serde(serialize_with = "iso_millis")]
    pub date: DateTime<Utc>,
}

impl From<&Repayment> for RepaymentResponse {
    fn from(repayment: &Repayment) -> Self {
        Self {
            id: repayment.id,
            loan_id: repayment.loan_id,
            amount: repayment.amount,
            date: repayment.date,
        }
    }
}

impl From<Repayment> for RepaymentResponse {
    fn from(repayment: Repayment) -> Self {
        Self::from(&repayment)
    }
}

/// Loans owned by a user together with every repayment against them
#[derive(Debug, Clone, Serialize)]
pub struct LoanSummary {
    pub loans: Vec<LoanResponse>,
    pub repayments: Vec<RepaymentResponse>,
}

/// One loan with its repayments and derived balance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBalance {
    pub loan: LoanResponse,
    pub repayments: Vec<RepaymentResponse>,
    pub total_repaid: f64,
    pub outstanding_balance: f64,
}

impl LoanBalance {
    /// Derive totals for `loan` from its repayments.
    pub fn new(loan: &Loan, repayments: Vec<Repayment>) -> Self {
        let total_repaid: f64 = repayments.iter().map(|r| r.amount).sum();
        Self {
            loan: LoanResponse::from(loan),
            outstanding_balance: loan.amount - total_repaid,
            total_repaid,
            repayments: repayments.iter().map(Into::into).collect(),
        }
    }

    /// One balance per loan in `loans` order, splitting `repayments` by loan.
    pub fn for_loans(loans: &[Loan], repayments: Vec<Repayment>) -> Vec<Self> {
        let mut by_loan: HashMap<Uuid, Vec<Repayment>> = HashMap::new();
        for repayment in repayments {
            by_loan.entry(repayment.loan_id).or_default().push(repayment);
        }

        loans
            .iter()
            .map(|loan| Self::new(loan, by_loan.remove(&loan.id).unwrap_or_default()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_response_shape() {
        let repayment = Repayment {
            id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            amount: 5000.0,
            date: Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(RepaymentResponse::from(&repayment)).unwrap();

        assert_eq!(json["loanId"], repayment.loan_id.to_string());
        assert_eq!(json["amount"], 5000.0);
        assert_eq!(json["date"], "2025-03-01T10:30:00.000Z");
    }

    #[test]
    fn test_loan_balance_from_repayments() {
        let loan = Loan::new(Uuid::new_v4(), 1000.0, "Car", 12);
        let paid = Repayment {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            amount: 400.0,
            date: Utc::now(),
        };

        let balance = LoanBalance::new(&loan, vec![paid]);
        assert_eq!(balance.total_repaid, 400.0);
        assert_eq!(balance.outstanding_balance, 600.0);
        assert_eq!(balance.repayments.len(), 1);
    }

    #[test]
    fn test_request_requires_both_fields() {
        let missing_amount: RepaymentRequest =
            serde_json::from_str(&format!(r#"{{"loanId":"{}"}}"#, Uuid::new_v4())).unwrap();
        let errors = missing_amount.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));

        let missing_loan: RepaymentRequest = serde_json::from_str(r#"{"amount":10}"#).unwrap();
        let errors = missing_loan.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("loan_id"));

        let complete: RepaymentRequest =
            serde_json::from_str(&format!(r#"{{"loanId":"{}","amount":10}}"#, Uuid::new_v4()))
                .unwrap();
        assert!(complete.validate().is_ok());
    }
}
