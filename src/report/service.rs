//! Admin reports over users, loans and repayments

use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::model::{HistoryFilter, MonthlyRepayments, RepaymentHistoryEntry, UserDetails};
use crate::loan::Loan;
use crate::models::User;
use crate::repayment::{LoanBalance, Repayment};
use crate::store::{LoanStore, RepaymentStore, StoreError, UserStore};

/// Why a report could not be produced
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Read-only views for administrators
pub struct ReportService {
    users: Arc<dyn UserStore>,
    loans: Arc<dyn LoanStore>,
    repayments: Arc<dyn RepaymentStore>,
}

impl ReportService {
    pub fn new(
        users: Arc<dyn UserStore>,
        loans: Arc<dyn LoanStore>,
        repayments: Arc<dyn RepaymentStore>,
    ) -> Self {
        Self {
            users,
            loans,
            repayments,
        }
    }

    /// Every repayment with its borrower's name, newest first.
    ///
    /// Repayments whose loan or borrower no longer resolves are left out.
    pub async fn repayment_history(
        &self,
        filter: &HistoryFilter,
    ) -> ReportResult<Vec<RepaymentHistoryEntry>> {
        let repayments = self.repayments.find_all().await?;
        let loans = self.loans.find_all(None).await?;

        let mut owner_ids: Vec<Uuid> = loans.iter().map(|loan| loan.user_id).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        let users = self.users.find_by_ids(&owner_ids).await?;

        Ok(history_entries(&repayments, &loans, &users, filter, Utc::now()))
    }

    /// Repayment count and total per UTC calendar month, oldest month first.
    pub async fn monthly_repayments(&self) -> ReportResult<Vec<MonthlyRepayments>> {
        let repayments = self.repayments.find_all().await?;
        Ok(monthly_totals(&repayments))
    }

    /// A user's loans with balances, plus totals lent and repaid.
    pub async fn user_details(&self, user_id: Uuid) -> ReportResult<UserDetails> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ReportError::NotFound("User not found".to_string()))?;

        let loans = self.loans.find_by_owner(user_id).await?;
        let loan_ids: Vec<Uuid> = loans.iter().map(|loan| loan.id).collect();
        let repayments = self.repayments.find_by_loan_ids(&loan_ids).await?;

        Ok(UserDetails::new(user, LoanBalance::for_loans(&loans, repayments)))
    }
}

fn history_entries(
    repayments: &[Repayment],
    loans: &[Loan],
    users: &[User],
    filter: &HistoryFilter,
    now: DateTime<Utc>,
) -> Vec<RepaymentHistoryEntry> {
    let loans: HashMap<Uuid, &Loan> = loans.iter().map(|loan| (loan.id, loan)).collect();
    let users: HashMap<Uuid, &User> = users.iter().map(|user| (user.id, user)).collect();

    let mut entries: Vec<RepaymentHistoryEntry> = repayments
        .iter()
        .filter(|repayment| filter.period.contains(repayment.date, now))
        .filter_map(|repayment| {
            let loan = loans.get(&repayment.loan_id)?;
            let user = users.get(&loan.user_id)?;
            Some(RepaymentHistoryEntry {
                id: repayment.id,
                date: repayment.date,
                customer: user.name.clone(),
                loan_id: loan.id,
                amount: repayment.amount,
                status: "Completed",
            })
        })
        .filter(|entry| filter.matches_customer(&entry.customer))
        .collect();

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}

fn monthly_totals(repayments: &[Repayment]) -> Vec<MonthlyRepayments> {
    let mut months: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for repayment in repayments {
        let key = format!("{:04}-{:02}", repayment.date.year(), repayment.date.month());
        let entry = months.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += repayment.amount;
    }

    months
        .into_iter()
        .map(|(month, (count, total))| MonthlyRepayments { month, count, total })
        .collect()
}
