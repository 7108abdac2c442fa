//! Identity resolution for incoming calls

use crate::models::{Actor, UserRole};
use uuid::Uuid;

use super::jwt::{generate_access_token, verify_token, JwtError};

/// Resolves the acting user from a bearer credential.
///
/// Tokens are issued by the login flow elsewhere; this service only needs the
/// shared secret to check them. `issue_access_token` exists for tooling and
/// tests.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    access_token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(jwt_secret: String, access_token_ttl_seconds: i64) -> Self {
        Self {
            jwt_secret,
            access_token_ttl_seconds,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn authenticate(&self, token: &str) -> Result<Actor, JwtError> {
        verify_token(token, &self.jwt_secret)?.actor()
    }

    pub fn issue_access_token(&self, user_id: Uuid, role: UserRole) -> Result<String, JwtError> {
        generate_access_token(user_id, role, &self.jwt_secret, self.access_token_ttl_seconds)
    }
}
