//! Repayment domain module
//!
//! Contains models and the ledger service.

mod error;
mod ledger;
mod model;

pub use error::RepaymentError;
pub use ledger::{RepaymentLedger, AMOUNT_EPSILON};
pub use model::*;
pub(crate) use model::iso_millis;
