//! Authentication extractor
//!
//! Resolves the bearer token in the Authorization header to a user id.

use super::error::ApiError;
use super::state::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use trackit_common::AppError;

/// Authenticated caller of an HTTP endpoint
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        let user_id = app_state.identity().authenticate(bearer.token()).await?;

        Ok(Self { user_id })
    }
}
