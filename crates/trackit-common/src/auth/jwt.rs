//! JWT utilities for authentication
//!
//! Issues and validates the HS256 tokens handed out at login. The hub only ever
//! validates; issuing lives here so the login collaborator and the tests share
//! one claim layout.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims structure
///
/// Tokens minted by the existing login endpoint carry `user_id`; a standard
/// `sub` claim is read as well. When both are present `user_id` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Standard subject claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// The user this token was issued for
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.user_id.as_deref().or(self.sub.as_deref())
    }
}

/// JWT service for encoding and decoding tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: i64,
}

impl JwtService {
    /// Create a new JWT service with the given secret and expiry (seconds)
    #[must_use]
    pub fn new(secret: &str, token_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry,
        }
    }

    /// Issue a token for a user
    ///
    /// # Errors
    /// Returns an error if token encoding fails or the user id is empty
    pub fn issue_token(&self, user_id: &str) -> Result<String, AppError> {
        self.issue_token_with_expiry(user_id, self.token_expiry)
    }

    fn issue_token_with_expiry(&self, user_id: &str, expiry: i64) -> Result<String, AppError> {
        if user_id.is_empty() {
            return Err(AppError::InvalidInput("user id must not be empty".to_string()));
        }

        let now = Utc::now();
        let claims = Claims {
            user_id: Some(user_id.to_string()),
            sub: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Decode and validate a JWT token
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return the user id it was issued for
    ///
    /// # Errors
    /// Returns an error if the token is invalid, expired, or carries an empty user id
    pub fn validate_token(&self, token: &str) -> Result<String, AppError> {
        let claims = self.decode_token(token)?;

        match claims.subject() {
            Some(user_id) if !user_id.is_empty() => Ok(user_id.to_string()),
            _ => Err(AppError::InvalidToken),
        }
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_expiry", &self.token_expiry)
            .finish_non_exhaustive()
    }
}
