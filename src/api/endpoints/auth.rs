//! Staff authentication endpoints.
//!
//! `POST /api/auth/init-admin` and `POST /api/auth/login` are unprotected;
//! `register` and `profile` sit behind the bearer-token middleware.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::accounts::{self, Actor, LoginRequest, LoginResponse, RegisterRequest};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ValidJson};
use crate::models::User;

/// `POST /api/auth/init-admin`: first-run bootstrap of the admin account.
pub async fn init_admin(
    State(ctx): State<ApiContext>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let conn = ctx.core.open_db()?;
    let user = accounts::init_admin(&conn, request)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let response = accounts::login(&conn, request, ctx.core.config.token_ttl_hours)?;
    Ok(Json(response))
}

/// `POST /api/auth/register`: admin creates a staff account.
pub async fn register(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let conn = ctx.core.open_db()?;
    let user = accounts::register(&conn, &actor, request)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/auth/profile`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(accounts::profile(&conn, &actor)?))
}
