// handlers/mod.rs - Tiered handler architecture
//
// Public (no auth) → Protected (token auth) → Admin (token auth + admin role)
//
// Handlers only bind requests and translate service results; every rule lives
// in the service layer.

pub mod admin;
pub mod protected;
pub mod public;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Json, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

/// JSON body extractor whose rejections use the API error envelope
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::warn!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::invalid_json(rejection.body_text()))
            }
        }
    }
}

/// Query string extractor whose rejections use the API error envelope
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => {
                tracing::warn!("Rejected query string: {}", rejection.body_text());
                Err(ApiError::bad_request(rejection.body_text()))
            }
        }
    }
}

/// Path identifier; a malformed id cannot name an existing record
pub(crate) fn path_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!("Malformed {} id '{}' in path", what, raw);
        ApiError::not_found(format!("{} not found", what))
    })
}
