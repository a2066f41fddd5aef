//! Reference data and the other list/create-only collections.
//!
//! None of these resources can be updated or deleted through the API.
//! Referenced ids must exist; a dangling id is answered with 404 before
//! anything is written.

use rusqlite::Connection;

use crate::accounts::Actor;
use crate::api::error::{required, required_text, ApiError};
use crate::crypto;
use crate::db::repository;
use crate::models::dates::{now_timestamp, parse_datetime};
use crate::models::*;

// ── Name/description tables ─────────────────────────────────

pub fn list_named(conn: &Connection, table: ReferenceTable) -> Result<Vec<NamedEntry>, ApiError> {
    Ok(repository::list_named_entries(conn, table)?)
}

pub fn create_named(
    conn: &Connection,
    actor: &Actor,
    table: ReferenceTable,
    input: NewNamedEntry,
) -> Result<NamedEntry, ApiError> {
    let name = required_text(input.name, "name")?;
    let entry = repository::insert_named_entry(conn, table, &name, input.description.as_deref())?;
    tracing::debug!(table = table.table_name(), id = entry.id, by = actor.user_id, "Reference entry created");
    Ok(entry)
}

// ── Sample statuses ─────────────────────────────────────────

pub fn list_sample_statuses(conn: &Connection) -> Result<Vec<SampleStatus>, ApiError> {
    Ok(repository::list_sample_statuses(conn)?)
}

pub fn create_sample_status(conn: &Connection, actor: &Actor, input: NewSampleStatus) -> Result<SampleStatus, ApiError> {
    let now = now_timestamp();
    let status = SampleStatus {
        id: 0,
        name: required_text(input.name, "name")?,
        description: input.description,
        code: input.code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_sample_status(conn, &status)?;
    tracing::debug!(id, by = actor.user_id, "Sample status created");
    repository::get_sample_status(conn, id)?.ok_or_else(|| ApiError::not_found("SampleStatus", id))
}

// ── External labs ───────────────────────────────────────────

pub fn list_external_labs(conn: &Connection) -> Result<Vec<ExternalLab>, ApiError> {
    Ok(repository::list_external_labs(conn)?)
}

pub fn create_external_lab(conn: &Connection, actor: &Actor, input: NewExternalLab) -> Result<ExternalLab, ApiError> {
    let now = now_timestamp();
    let lab = ExternalLab {
        id: 0,
        name: required_text(input.name, "name")?,
        address: input.address,
        phone: input.phone,
        email: input.email,
        contact_person: input.contact_person,
        is_active: input.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_external_lab(conn, &lab)?;
    tracing::debug!(id, by = actor.user_id, "External lab created");
    repository::get_external_lab(conn, id)?.ok_or_else(|| ApiError::not_found("ExternalLab", id))
}

// ── Services ────────────────────────────────────────────────

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, ApiError> {
    Ok(repository::list_services(conn)?)
}

pub fn create_service(conn: &Connection, actor: &Actor, input: NewService) -> Result<Service, ApiError> {
    let name = required_text(input.name, "name")?;
    let group_id = required(input.service_group_id, "service_group_id")?;
    let price = input.price.unwrap_or(0.0);
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::BadRequest("price must be a non-negative number".into()));
    }
    repository::get_named_entry(conn, ReferenceTable::ServiceGroups, group_id)?
        .ok_or_else(|| ApiError::not_found("ServiceGroup", group_id))?;

    let now = now_timestamp();
    let service = Service {
        id: 0,
        name,
        description: input.description,
        price: repository::round_money(price),
        service_group_id: Some(group_id),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_service(conn, &service)?;
    tracing::debug!(id, by = actor.user_id, "Service created");
    repository::get_service(conn, id)?.ok_or_else(|| ApiError::not_found("Service", id))
}

// ── Result portal users ─────────────────────────────────────

pub fn list_web_result_users(conn: &Connection) -> Result<Vec<WebResultUser>, ApiError> {
    Ok(repository::list_web_result_users(conn)?)
}

pub fn create_web_result_user(
    conn: &Connection,
    actor: &Actor,
    input: NewWebResultUser,
) -> Result<WebResultUser, ApiError> {
    let username = required_text(input.username, "username")?;
    let password = required(input.password.filter(|p| !p.is_empty()), "password")?;
    let patient_id = required(input.patient_id, "patient_id")?;
    repository::get_patient(conn, patient_id)?.ok_or_else(|| ApiError::not_found("Patient", patient_id))?;
    if let Some(company_id) = input.company_id {
        repository::get_company(conn, company_id)?.ok_or_else(|| ApiError::not_found("Company", company_id))?;
    }

    let now = now_timestamp();
    let user = WebResultUser {
        id: 0,
        username,
        password_hash: crypto::hash_password(&password),
        patient_id: Some(patient_id),
        company_id: input.company_id,
        is_active: input.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_web_result_user(conn, &user)?;
    tracing::info!(id, patient_id, by = actor.user_id, "Result portal user created");
    repository::get_web_result_user(conn, id)?.ok_or_else(|| ApiError::not_found("WebResultUser", id))
}

// ── Protocol services ───────────────────────────────────────

pub fn list_protocol_services(conn: &Connection) -> Result<Vec<ProtocolService>, ApiError> {
    Ok(repository::list_protocol_services(conn)?)
}

/// Order one more service on an existing protocol; the catalog price applies
/// unless a price is given.
pub fn create_protocol_service(
    conn: &Connection,
    actor: &Actor,
    input: NewProtocolService,
) -> Result<ProtocolService, ApiError> {
    let protocol_id = required(input.protocol_id, "protocol_id")?;
    let service_id = required(input.service_id, "service_id")?;
    repository::get_protocol(conn, protocol_id)?.ok_or_else(|| ApiError::not_found("Protocol", protocol_id))?;
    let service = repository::get_service(conn, service_id)?.ok_or_else(|| ApiError::not_found("Service", service_id))?;
    let price = match input.price {
        Some(p) if !p.is_finite() || p < 0.0 => {
            return Err(ApiError::BadRequest("price must be a non-negative number".into()))
        }
        Some(p) => repository::round_money(p),
        None => service.price,
    };

    let now = now_timestamp();
    let ps = ProtocolService {
        id: 0,
        protocol_id,
        service_id,
        price,
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_protocol_service(conn, &ps)?;
    tracing::debug!(id, protocol_id, service_id, by = actor.user_id, "Protocol service added");
    repository::get_protocol_service(conn, id)?.ok_or_else(|| ApiError::not_found("ProtocolService", id))
}

// ── External lab submissions ────────────────────────────────

pub fn list_submissions(conn: &Connection) -> Result<Vec<ExternalLabSubmission>, ApiError> {
    Ok(repository::list_submissions(conn)?)
}

pub fn create_submission(
    conn: &Connection,
    actor: &Actor,
    input: NewExternalLabSubmission,
) -> Result<ExternalLabSubmission, ApiError> {
    let protocol_service_id = required(input.protocol_service_id, "protocol_service_id")?;
    let external_lab_id = required(input.external_lab_id, "external_lab_id")?;
    repository::get_protocol_service(conn, protocol_service_id)?
        .ok_or_else(|| ApiError::not_found("ProtocolService", protocol_service_id))?;
    repository::get_external_lab(conn, external_lab_id)?
        .ok_or_else(|| ApiError::not_found("ExternalLab", external_lab_id))?;

    let now = now_timestamp();
    let submission = ExternalLabSubmission {
        id: 0,
        protocol_service_id,
        external_lab_id,
        submission_date: optional_datetime(input.submission_date.as_deref(), "submission_date")?.unwrap_or(now),
        expected_return_date: optional_datetime(input.expected_return_date.as_deref(), "expected_return_date")?,
        return_date: None,
        status: input
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SUBMISSION_STATUS_SUBMITTED.to_string()),
        notes: input.notes,
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_submission(conn, &submission)?;
    tracing::info!(id, protocol_service_id, external_lab_id, by = actor.user_id, "Sample sent to external lab");
    repository::get_submission(conn, id)?.ok_or_else(|| ApiError::not_found("ExternalLabSubmission", id))
}

/// Parse an optional date-time field; blank counts as absent.
pub(crate) fn optional_datetime(raw: Option<&str>, field: &str) -> Result<Option<chrono::NaiveDateTime>, ApiError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(r) => parse_datetime(r)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: {r}"))),
    }
}
