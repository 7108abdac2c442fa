//! QuickFund Backend Library
//!
//! Repayment ledger for QuickFund loans: records repayments, derives
//! outstanding balances and closes fully repaid loans, behind an axum API,
//! plus the admin reports built on the same data.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod repayment;
pub mod report;
pub mod routes;
pub mod state;
pub mod store;
