//! Authentication extractor
//!
//! Verifies the bearer token (signature, expiry, blacklist) and hands the
//! resolved user id and role to the handler.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use std::sync::Arc;

use super::client_ip::client_ip;
use crate::auth::{Actor, AuthService, Claims};
use crate::error::ApiError;
use crate::store::ObjectId;

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: ObjectId,
    pub username: String,
    pub role: String,
    /// Raw token, needed to blacklist it on logout
    pub token: String,
    pub claims: Claims,
    pub client_ip: Option<String>,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role.clone())
    }
}

/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let token = bearer.token().to_string();

        let claims = auth_service.validate_token(&token).await?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username.clone(),
            role: claims.role.clone(),
            token,
            claims,
            client_ip: client_ip(&parts.headers),
        })
    }
}
