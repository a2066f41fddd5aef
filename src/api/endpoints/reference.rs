//! List/create endpoints for reference data and the other single-collection
//! resources (`/examination-types`, `/services`, `/protocol-services`, …).
//!
//! The five name/description tables share one pair of handlers through
//! [`named_collection`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, MethodRouter};
use axum::{Extension, Json};

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ValidJson};
use crate::catalog;
use crate::models::*;

type Created<T> = (StatusCode, Json<T>);

/// `GET` + `POST` for one of the [`ReferenceTable`] lookups.
pub fn named_collection(table: ReferenceTable) -> MethodRouter<ApiContext> {
    get(move |State(ctx): State<ApiContext>| async move {
        let conn = ctx.core.open_db()?;
        Ok::<_, ApiError>(Json(catalog::list_named(&conn, table)?))
    })
    .post(
        move |State(ctx): State<ApiContext>,
              Extension(actor): Extension<Actor>,
              ValidJson(input): ValidJson<NewNamedEntry>| async move {
            let conn = ctx.core.open_db()?;
            let entry = catalog::create_named(&conn, &actor, table, input)?;
            Ok::<_, ApiError>((StatusCode::CREATED, Json(entry)))
        },
    )
}

pub async fn list_sample_statuses(State(ctx): State<ApiContext>) -> Result<Json<Vec<SampleStatus>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_sample_statuses(&conn)?))
}

pub async fn create_sample_status(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewSampleStatus>,
) -> Result<Created<SampleStatus>, ApiError> {
    let conn = ctx.core.open_db()?;
    let status = catalog::create_sample_status(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn list_external_labs(State(ctx): State<ApiContext>) -> Result<Json<Vec<ExternalLab>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_external_labs(&conn)?))
}

pub async fn create_external_lab(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewExternalLab>,
) -> Result<Created<ExternalLab>, ApiError> {
    let conn = ctx.core.open_db()?;
    let lab = catalog::create_external_lab(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(lab)))
}

pub async fn list_services(State(ctx): State<ApiContext>) -> Result<Json<Vec<Service>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_services(&conn)?))
}

pub async fn create_service(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewService>,
) -> Result<Created<Service>, ApiError> {
    let conn = ctx.core.open_db()?;
    let service = catalog::create_service(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_web_result_users(State(ctx): State<ApiContext>) -> Result<Json<Vec<WebResultUser>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_web_result_users(&conn)?))
}

pub async fn create_web_result_user(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewWebResultUser>,
) -> Result<Created<WebResultUser>, ApiError> {
    let conn = ctx.core.open_db()?;
    let user = catalog::create_web_result_user(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_protocol_services(State(ctx): State<ApiContext>) -> Result<Json<Vec<ProtocolService>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_protocol_services(&conn)?))
}

pub async fn create_protocol_service(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewProtocolService>,
) -> Result<Created<ProtocolService>, ApiError> {
    let conn = ctx.core.open_db()?;
    let line = catalog::create_protocol_service(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(line)))
}

pub async fn list_submissions(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<ExternalLabSubmission>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(catalog::list_submissions(&conn)?))
}

pub async fn create_submission(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewExternalLabSubmission>,
) -> Result<Created<ExternalLabSubmission>, ApiError> {
    let conn = ctx.core.open_db()?;
    let submission = catalog::create_submission(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(submission)))
}
