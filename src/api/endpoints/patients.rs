//! Patient endpoints.
//!
//! - `GET/POST /api/patients`
//! - `GET /api/patients/exists?tc_identity_number=…`
//! - `POST /api/patients/import-excel` (multipart, field `file`)
//! - `GET/PUT/DELETE /api/patients/:id`

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ValidJson, ValidQuery};
use crate::models::{NewPatient, PatientExists, PatientFilter, PatientUpdate, PatientView};
use crate::patient_import::{self, ImportReport};
use crate::patients;

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
    pub company_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct ExistsQuery {
    pub tc_identity_number: Option<String>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<PatientListQuery>,
) -> Result<Json<Vec<PatientView>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = PatientFilter {
        search: query.search,
        company_id: query.company_id,
    };
    Ok(Json(patients::list(&conn, &filter)?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PatientView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(patients::get(&conn, id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewPatient>,
) -> Result<(StatusCode, Json<PatientView>), ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = patients::create(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<PatientUpdate>,
) -> Result<Json<PatientView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(patients::update(&conn, &actor, id, input)?))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    patients::delete(&conn, &actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/patients/exists`: duplicate check before registration.
pub async fn exists(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<ExistsQuery>,
) -> Result<Json<PatientExists>, ApiError> {
    let conn = ctx.core.open_db()?;
    let result = patients::exists_by_national_id(&conn, query.tc_identity_number.as_deref())?;
    Ok(Json(result))
}

/// `POST /api/patients/import-excel`: bulk registration from an uploaded
/// workbook or its CSV export.
pub async fn import(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>, ApiError> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            data = Some(bytes);
            break;
        }
    }
    let data = data.ok_or_else(|| ApiError::missing("file"))?;

    let conn = ctx.core.open_db()?;
    Ok(Json(patient_import::import_sheet(&conn, &actor, &data)?))
}
