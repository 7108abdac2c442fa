//! Admin reporting module
//!
//! Repayment history with filters, monthly totals and per-user details.

mod model;
mod service;

pub use model::*;
pub use service::{ReportError, ReportResult, ReportService};
