//! Protocol (patient visit) endpoints.
//!
//! List results omit payments; the single-protocol view includes them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{query_date, ApiContext, ValidJson, ValidQuery};
use crate::models::{CreatedProtocol, NewProtocol, ProtocolFilter, ProtocolUpdate, ProtocolView};
use crate::protocols;

#[derive(Deserialize)]
pub struct ProtocolListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub patient_id: Option<i64>,
    pub company_id: Option<i64>,
    pub examination_type_id: Option<i64>,
    pub status: Option<String>,
}

impl ProtocolListQuery {
    fn into_filter(self) -> Result<ProtocolFilter, ApiError> {
        Ok(ProtocolFilter {
            start_date: query_date(self.start_date.as_deref(), "start_date")?,
            end_date: query_date(self.end_date.as_deref(), "end_date")?,
            patient_id: self.patient_id,
            company_id: self.company_id,
            examination_type_id: self.examination_type_id,
            status: self.status,
        })
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<ProtocolListQuery>,
) -> Result<Json<Vec<ProtocolView>>, ApiError> {
    let filter = query.into_filter()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(protocols::list(&conn, &filter)?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<ProtocolView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(protocols::get(&conn, id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewProtocol>,
) -> Result<(StatusCode, Json<CreatedProtocol>), ApiError> {
    let conn = ctx.core.open_db()?;
    let created = protocols::create(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<ProtocolUpdate>,
) -> Result<Json<ProtocolView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(protocols::update(&conn, &actor, id, input)?))
}

/// `DELETE /api/protocols/:id`: dependents handled per the configured
/// delete policy.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    protocols::delete(&conn, &actor, id, ctx.core.config.protocol_delete_policy)?;
    Ok(StatusCode::NO_CONTENT)
}
