//! Payment endpoints and the cash summary report.
//!
//! Every write recomputes the owning protocol's `paid_amount` in the same
//! transaction (see `crate::payments`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::accounts::Actor;
use crate::api::error::ApiError;
use crate::api::types::{query_date, ApiContext, ValidJson, ValidQuery};
use crate::models::{CashSummary, NewPayment, PaymentFilter, PaymentUpdate, PaymentView};
use crate::payments;

#[derive(Deserialize)]
pub struct PaymentListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub protocol_id: Option<i64>,
    pub payment_type_id: Option<i64>,
    pub cash_register_id: Option<i64>,
}

impl PaymentListQuery {
    fn into_filter(self) -> Result<PaymentFilter, ApiError> {
        Ok(PaymentFilter {
            start_date: query_date(self.start_date.as_deref(), "start_date")?,
            end_date: query_date(self.end_date.as_deref(), "end_date")?,
            protocol_id: self.protocol_id,
            payment_type_id: self.payment_type_id,
            cash_register_id: self.cash_register_id,
        })
    }
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<PaymentListQuery>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let filter = query.into_filter()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(payments::list(&conn, &filter)?))
}

/// `GET /api/payments/summary`: totals per payment type for the filter.
pub async fn summary(
    State(ctx): State<ApiContext>,
    ValidQuery(query): ValidQuery<PaymentListQuery>,
) -> Result<Json<CashSummary>, ApiError> {
    let filter = query.into_filter()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(payments::cash_summary(&conn, &filter)?))
}

pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(payments::get(&conn, id)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    ValidJson(input): ValidJson<NewPayment>,
) -> Result<(StatusCode, Json<PaymentView>), ApiError> {
    let conn = ctx.core.open_db()?;
    let payment = payments::create(&conn, &actor, input)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<PaymentUpdate>,
) -> Result<Json<PaymentView>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(payments::update(&conn, &actor, id, input)?))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    payments::delete(&conn, &actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}
