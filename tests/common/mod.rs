//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quickfund_server::loan::{Loan, LoanStatus};
use quickfund_server::models::{Actor, User, UserRole};
use quickfund_server::repayment::{NewRepayment, RepaymentLedger};
use quickfund_server::report::ReportService;
use quickfund_server::store::{InMemoryStore, LoanStore, RepaymentStore};

pub const PRINCIPAL: f64 = 40000.0;

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub ledger: Arc<RepaymentLedger>,
    pub reports: Arc<ReportService>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let ledger = Arc::new(RepaymentLedger::new(store.clone(), store.clone()));
        let reports = Arc::new(ReportService::new(store.clone(), store.clone(), store.clone()));
        Self {
            store,
            ledger,
            reports,
        }
    }

    /// Another ledger over the same store, as a second server process would have
    pub fn second_ledger(&self) -> Arc<RepaymentLedger> {
        Arc::new(RepaymentLedger::new(self.store.clone(), self.store.clone()))
    }

    /// Register a borrower and return them as an actor
    pub async fn customer(&self, name: &str) -> Actor {
        let user = self
            .store
            .insert_user(User::new(
                name,
                format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                UserRole::User,
            ))
            .await;
        Actor::new(user.id, user.role)
    }

    pub async fn loan(&self, owner: &Actor, principal: f64, status: LoanStatus) -> Loan {
        self.store
            .insert_loan(Loan::new(owner.id, principal, "Education", 24).with_status(status))
            .await
    }

    pub async fn active_loan(&self, owner: &Actor) -> Loan {
        self.loan(owner, PRINCIPAL, LoanStatus::Active).await
    }

    /// Store a repayment directly, bypassing the ledger rules
    pub async fn prior_repayment(&self, loan: &Loan, amount: f64) {
        self.repayment_on(loan, amount, Utc::now()).await;
    }

    /// Store a repayment dated `date`, bypassing the ledger rules
    pub async fn repayment_on(&self, loan: &Loan, amount: f64, date: DateTime<Utc>) {
        let mut tx = self
            .store
            .begin_for_loan(loan.id)
            .await
            .expect("open transaction");
        tx.insert_repayment(NewRepayment {
            loan_id: loan.id,
            amount,
            date,
        })
        .await
        .expect("seed repayment");
        tx.commit().await.expect("commit seed");
    }

    pub async fn total_paid(&self, loan: &Loan) -> f64 {
        self.store
            .find_by_loan_ids(&[loan.id])
            .await
            .expect("load repayments")
            .iter()
            .map(|r| r.amount)
            .sum()
    }

    pub async fn outstanding(&self, loan: &Loan) -> f64 {
        loan.amount - self.total_paid(loan).await
    }

    pub async fn repayment_count(&self) -> usize {
        RepaymentStore::find_all(self.store.as_ref())
            .await
            .expect("load repayments")
            .len()
    }

    pub async fn status(&self, loan: &Loan) -> LoanStatus {
        LoanStore::find_by_id(self.store.as_ref(), loan.id)
            .await
            .expect("load loan")
            .expect("loan exists")
            .status
    }
}

pub fn user() -> Actor {
    Actor::new(Uuid::new_v4(), UserRole::User)
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), UserRole::Admin)
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= quickfund_server::repayment::AMOUNT_EPSILON
}
