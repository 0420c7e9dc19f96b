//! API handlers for the forex request backend

pub mod auth;
pub mod health;
pub mod profile;
pub mod reference;
pub mod requests;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::store::ObjectId;

pub use crate::middleware::AuthenticatedUser;

/// `Json` whose rejection renders through [`ApiError`] as a 400 with a message
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Optional JSON body: an empty body yields `None`, anything else must parse
#[derive(Debug, Clone, Default)]
pub struct OptionalApiJson<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalApiJson(None));
        }

        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(OptionalApiJson(Some(value))),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Parse a path identifier, echoing the literal on failure
pub(crate) fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    Ok(ObjectId::parse_str(raw)?)
}
