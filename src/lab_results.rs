//! Lab results and the sample-handling steps.
//!
//! `accept_sample` and `approve_sample` look their sample status up by its
//! stable code, never by display name. They do not check the current
//! status: approving a sample that was never accepted is allowed.

use rusqlite::Connection;

use crate::accounts::Actor;
use crate::api::error::{required, ApiError};
use crate::catalog::optional_datetime;
use crate::db::repository;
use crate::models::dates::{now_timestamp, parse_datetime};
use crate::models::enums::SampleStatusCode;
use crate::models::*;
use crate::protocols;

pub fn list(conn: &Connection, filter: &LabResultFilter) -> Result<Vec<LabResultView>, ApiError> {
    repository::list_lab_results(conn, filter)?
        .into_iter()
        .map(|lab| lab_view(conn, lab))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> Result<LabResultView, ApiError> {
    lab_view(conn, find(conn, id)?)
}

pub fn create(conn: &Connection, actor: &Actor, input: NewLabResult) -> Result<LabResultView, ApiError> {
    let protocol_service_id = required(input.protocol_service_id, "protocol_service_id")?;
    let barcode_date = optional_datetime(input.barcode_date.as_deref(), "barcode_date")?;
    repository::get_protocol_service(conn, protocol_service_id)?
        .ok_or_else(|| ApiError::not_found("ProtocolService", protocol_service_id))?;
    ensure_sample_status(conn, input.sample_status_id)?;
    ensure_rejection_reason(conn, input.rejection_reason_id)?;
    ensure_external_lab(conn, input.external_lab_id)?;

    let now = now_timestamp();
    let rejected = input.rejection_reason_id.is_some();
    let lab = LabResult {
        id: 0,
        protocol_service_id,
        barcode_number: input.barcode_number,
        result: input.result,
        result_text: input.result_text,
        reference_range: input.reference_range,
        unit: input.unit,
        is_abnormal: input.is_abnormal.unwrap_or(false),
        sample_status_id: input.sample_status_id,
        rejection_reason_id: input.rejection_reason_id,
        external_lab_id: input.external_lab_id,
        request_date: Some(now),
        acceptance_date: None,
        acceptance_by: None,
        barcode_date,
        approval_date: None,
        approved_by: None,
        rejection_date: rejected.then_some(now),
        rejected_by: rejected.then_some(actor.user_id),
        status: LAB_STATUS_PENDING.into(),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_lab_result(conn, &lab)?;
    tracing::info!(lab_result_id = id, protocol_service_id, by = actor.user_id, "Lab result requested");
    get(conn, id)
}

pub fn update(conn: &Connection, actor: &Actor, id: i64, input: LabResultUpdate) -> Result<LabResultView, ApiError> {
    let mut lab = find(conn, id)?;
    let now = now_timestamp();

    if let Some(&status_id) = input.sample_status_id.value() {
        ensure_sample_status(conn, Some(status_id))?;
    }
    if let Some(&reason_id) = input.rejection_reason_id.value() {
        ensure_rejection_reason(conn, Some(reason_id))?;
        // Naming a rejection reason is what rejects the sample.
        lab.rejection_date = Some(now);
        lab.rejected_by = Some(actor.user_id);
    }
    if let Some(&lab_id) = input.external_lab_id.value() {
        ensure_external_lab(conn, Some(lab_id))?;
    }

    input.barcode_number.apply_to(&mut lab.barcode_number);
    input.result.apply_to(&mut lab.result);
    input.result_text.apply_to(&mut lab.result_text);
    input.reference_range.apply_to(&mut lab.reference_range);
    input.unit.apply_to(&mut lab.unit);
    input.is_abnormal.apply_required("is_abnormal", &mut lab.is_abnormal)?;
    input.sample_status_id.apply_to(&mut lab.sample_status_id);
    input.rejection_reason_id.apply_to(&mut lab.rejection_reason_id);
    input.external_lab_id.apply_to(&mut lab.external_lab_id);
    match input.barcode_date {
        Patch::Absent => {}
        Patch::Null => lab.barcode_date = None,
        Patch::Value(raw) => {
            lab.barcode_date = Some(
                parse_datetime(&raw).ok_or_else(|| ApiError::BadRequest(format!("Invalid barcode_date: {raw}")))?,
            );
        }
    }
    input.status.apply_required("status", &mut lab.status)?;
    if lab.status.trim().is_empty() {
        return Err(ApiError::missing("status"));
    }
    lab.updated_at = now;

    repository::update_lab_result(conn, &lab)?;
    tracing::debug!(lab_result_id = id, by = actor.user_id, "Lab result updated");
    get(conn, id)
}

/// Mark the sample as received by the lab.
pub fn accept_sample(conn: &Connection, actor: &Actor, id: i64) -> Result<LabResultView, ApiError> {
    let mut lab = find(conn, id)?;
    let status = well_known_status(conn, SampleStatusCode::Accepted)?;
    let now = now_timestamp();

    lab.sample_status_id = Some(status.id);
    lab.acceptance_date = Some(now);
    lab.acceptance_by = Some(actor.user_id);
    lab.status = LAB_STATUS_PROCESSING.into();
    lab.updated_at = now;
    repository::update_lab_result(conn, &lab)?;

    tracing::info!(lab_result_id = id, by = actor.user_id, "Sample accepted");
    get(conn, id)
}

/// Sign off the result.
pub fn approve_sample(conn: &Connection, actor: &Actor, id: i64) -> Result<LabResultView, ApiError> {
    let mut lab = find(conn, id)?;
    let status = well_known_status(conn, SampleStatusCode::Completed)?;
    let now = now_timestamp();

    lab.sample_status_id = Some(status.id);
    lab.approval_date = Some(now);
    lab.approved_by = Some(actor.user_id);
    lab.status = LAB_STATUS_COMPLETED.into();
    lab.updated_at = now;
    repository::update_lab_result(conn, &lab)?;

    tracing::info!(lab_result_id = id, by = actor.user_id, "Result approved");
    get(conn, id)
}

pub fn delete(conn: &Connection, actor: &Actor, id: i64) -> Result<(), ApiError> {
    actor.require_admin()?;
    repository::delete_lab_result(conn, id)?;
    tracing::info!(lab_result_id = id, by = actor.user_id, "Lab result deleted");
    Ok(())
}

fn find(conn: &Connection, id: i64) -> Result<LabResult, ApiError> {
    repository::get_lab_result(conn, id)?.ok_or_else(|| ApiError::not_found("LabResult", id))
}

fn well_known_status(conn: &Connection, code: SampleStatusCode) -> Result<SampleStatus, ApiError> {
    repository::get_sample_status_by_code(conn, code)?
        .ok_or_else(|| ApiError::NotFound(format!("Sample status '{code}' is not configured")))
}

fn lab_view(conn: &Connection, lab: LabResult) -> Result<LabResultView, ApiError> {
    let protocol_service = match repository::get_protocol_service(conn, lab.protocol_service_id)? {
        Some(ps) => {
            let service = repository::get_service(conn, ps.service_id)?;
            let protocol = match repository::get_protocol(conn, ps.protocol_id)? {
                Some(p) => Some(protocols::with_patient(conn, p)?),
                None => None,
            };
            Some(ProtocolServiceContext {
                protocol_service: ps,
                service,
                protocol,
            })
        }
        None => None,
    };
    let sample_status = match lab.sample_status_id {
        Some(status_id) => repository::get_sample_status(conn, status_id)?,
        None => None,
    };
    let rejection_reason = match lab.rejection_reason_id {
        Some(reason_id) => {
            repository::get_named_entry(conn, ReferenceTable::SampleRejectionReasons, reason_id)?
        }
        None => None,
    };
    let external_lab = match lab.external_lab_id {
        Some(lab_id) => repository::get_external_lab(conn, lab_id)?,
        None => None,
    };
    Ok(LabResultView {
        lab_result: lab,
        protocol_service,
        sample_status,
        rejection_reason,
        external_lab,
    })
}

fn ensure_sample_status(conn: &Connection, id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = id {
        repository::get_sample_status(conn, id)?.ok_or_else(|| ApiError::not_found("SampleStatus", id))?;
    }
    Ok(())
}

fn ensure_rejection_reason(conn: &Connection, id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = id {
        repository::get_named_entry(conn, ReferenceTable::SampleRejectionReasons, id)?
            .ok_or_else(|| ApiError::not_found("SampleRejectionReason", id))?;
    }
    Ok(())
}

fn ensure_external_lab(conn: &Connection, id: Option<i64>) -> Result<(), ApiError> {
    if let Some(id) = id {
        repository::get_external_lab(conn, id)?.ok_or_else(|| ApiError::not_found("ExternalLab", id))?;
    }
    Ok(())
}
