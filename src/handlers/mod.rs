//! API handlers for the QuickFund backend

pub mod admin;
pub mod health;
pub mod repayment;

pub use repayment::*;

// Re-export extractors from middleware for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser};
