use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::{TokenError, TokenKeys};
use crate::error::ApiError;

/// Extracts and validates the bearer token, returning the user ID.
///
/// The token travels in the `auth-token` request header as a bare JWT.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);
        let token = parts
            .headers
            .get("auth-token")
            .and_then(|h| h.to_str().ok())
            .ok_or(TokenError::Missing)?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            e
        })?;

        Ok(AuthUser(claims.sub))
    }
}
