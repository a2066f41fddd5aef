//! Shared types for the HTTP layer.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::dates::parse_date;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// JSON body extractor that answers malformed input with the API's own
/// 400 error body instead of axum's plain-text rejection.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Query-string extractor with the same error shape as [`ValidJson`].
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidQuery(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Parse an optional `start_date` / `end_date` query value.
pub fn query_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) => parse_date(r)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: {r}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_dates_are_optional_but_must_parse() {
        assert_eq!(query_date(None, "start_date").unwrap(), None);
        assert_eq!(query_date(Some(""), "start_date").unwrap(), None);
        assert_eq!(
            query_date(Some("2024-03-01"), "start_date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(matches!(
            query_date(Some("03/01/2024"), "end_date").unwrap_err(),
            ApiError::BadRequest(msg) if msg == "Invalid end_date: 03/01/2024"
        ));
    }
}
