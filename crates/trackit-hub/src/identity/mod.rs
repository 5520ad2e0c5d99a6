//! Connection identity
//!
//! Resolves the credential presented at upgrade time to a stable user id.
//! Connections are only constructed for credentials that resolve.

use async_trait::async_trait;
use trackit_common::{AppError, AppResult, JwtService};

/// Source of truth for who is on the other end of a connection
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer credential to a user id
    async fn authenticate(&self, credential: &str) -> AppResult<String>;
}

/// Identity provider backed by HS256 access tokens
#[derive(Debug)]
pub struct JwtIdentityProvider {
    jwt: JwtService,
}

impl JwtIdentityProvider {
    #[must_use]
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }

    /// Token service, for issuing credentials
    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, credential: &str) -> AppResult<String> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AppError::MissingAuth);
        }

        self.jwt.validate_token(credential).map_err(|e| {
            tracing::warn!(error = %e, "Invalid access token");
            e
        })
    }
}
