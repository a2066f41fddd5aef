//! Company endpoints, including the nested unit collection.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ValidJson, ValidQuery};
use crate::companies;
use crate::models::{CompanyFilter, CompanyUnit, CompanyUpdate, CompanyWithUnits, NewCompany, NewCompanyUnit};

#[derive(Deserialize)]
pub struct CompanyListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<CompanyListQuery>,
) -> Result<Json<Vec<CompanyWithUnits>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = CompanyFilter {
        search: query.search,
        is_active: query.is_active,
    };
    Ok(Json(companies::list(&conn, &filter)?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<CompanyWithUnits>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(companies::get(&conn, id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewCompany>,
) -> Result<(StatusCode, Json<CompanyWithUnits>), ApiError> {
    let conn = ctx.core.open_db()?;
    let company = companies::create(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<CompanyUpdate>,
) -> Result<Json<CompanyWithUnits>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(companies::update(&conn, &actor, id, input)?))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    companies::delete(&conn, &actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/companies/:id/units`
pub async fn list_units(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CompanyUnit>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(companies::list_units(&conn, id)?))
}

/// `POST /api/companies/:id/units`
pub async fn create_unit(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<NewCompanyUnit>,
) -> Result<(StatusCode, Json<CompanyUnit>), ApiError> {
    let conn = ctx.core.open_db()?;
    let unit = companies::create_unit(&conn, &actor, id, input)?;
    Ok((StatusCode::CREATED, Json(unit)))
}
