//! Lab result endpoints and the sample workflow actions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ValidJson, ValidQuery};
use crate::lab_results;
use crate::models::{LabResultFilter, LabResultUpdate, LabResultView, NewLabResult};

#[derive(Deserialize)]
pub struct LabResultListQuery {
    pub protocol_service_id: Option<i64>,
    pub sample_status_id: Option<i64>,
    pub barcode_number: Option<String>,
    pub status: Option<String>,
    pub external_lab_id: Option<i64>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<LabResultListQuery>,
) -> Result<Json<Vec<LabResultView>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = LabResultFilter {
        protocol_service_id: query.protocol_service_id,
        sample_status_id: query.sample_status_id,
        barcode_number: query.barcode_number,
        status: query.status,
        external_lab_id: query.external_lab_id,
    };
    Ok(Json(lab_results::list(&conn, &filter)?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<LabResultView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(lab_results::get(&conn, id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewLabResult>,
) -> Result<(StatusCode, Json<LabResultView>), ApiError> {
    let conn = ctx.core.open_db()?;
    let result = lab_results::create(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<LabResultUpdate>,
) -> Result<Json<LabResultView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(lab_results::update(&conn, &actor, id, input)?))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    lab_results::delete(&conn, &actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/lab-results/:id/accept`: sample received by the lab.
pub async fn accept(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<LabResultView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(lab_results::accept_sample(&conn, &actor, id)?))
}

/// `POST /api/lab-results/:id/approve`: result signed off.
pub async fn approve(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<LabResultView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(lab_results::approve_sample(&conn, &actor, id)?))
}
