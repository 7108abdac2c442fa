//! Authentication module for QuickFund
//!
//! - JWT access token generation and validation
//! - Resolution of the acting user and role for each call

mod jwt;
mod service;

pub use jwt::{generate_access_token, verify_token, Claims, JwtError};
pub use service::AuthService;
