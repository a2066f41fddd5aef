//! Patient registry: listing, registration, partial updates and the
//! national-id probe used by the registration form.

use rusqlite::Connection;

use crate::accounts::Actor;
use crate::api::error::{required, required_text, ApiError};
use crate::db::repository;
use crate::models::dates::{now_timestamp, parse_date};
use crate::models::*;

/// Length of a Turkish national identity number (T.C. Kimlik No).
pub const NATIONAL_ID_LENGTH: usize = 11;

pub fn list(conn: &Connection, filter: &PatientFilter) -> Result<Vec<PatientView>, ApiError> {
    repository::list_patients(conn, filter)?
        .into_iter()
        .map(|p| patient_view(conn, p))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> Result<PatientView, ApiError> {
    let patient = repository::get_patient(conn, id)?.ok_or_else(|| ApiError::not_found("Patient", id))?;
    patient_view(conn, patient)
}

pub fn create(conn: &Connection, actor: &Actor, input: NewPatient) -> Result<PatientView, ApiError> {
    let first_name = required_text(input.first_name, "first_name")?;
    let last_name = required_text(input.last_name, "last_name")?;
    let gender = required(input.gender, "gender")?;
    let birth_date = input.birth_date.as_deref().map(parse_birth_date).transpose()?.flatten();

    let tc_identity_number = non_blank(input.tc_identity_number);
    if let Some(tc) = &tc_identity_number {
        ensure_national_id_free(conn, tc, None)?;
    }

    let now = now_timestamp();
    let mut patient = Patient {
        id: 0,
        tc_identity_number,
        registration_number: non_blank(input.registration_number),
        passport_number: non_blank(input.passport_number),
        first_name,
        last_name,
        birth_date,
        gender,
        mother_name: input.mother_name,
        father_name: input.father_name,
        mobile_phone: input.mobile_phone,
        home_phone: input.home_phone,
        email: input.email,
        address: input.address,
        notes: input.notes,
        photo_url: input.photo_url,
        company_id: None,
        company_unit_id: None,
        created_at: now,
        updated_at: now,
    };
    patient.company_id = existing_company(conn, input.company_id)?;
    patient.company_unit_id = existing_unit(conn, input.company_unit_id)?;

    let id = repository::insert_patient(conn, &patient)?;
    tracing::info!(patient_id = id, by = actor.user_id, "Patient registered");
    get(conn, id)
}

pub fn update(conn: &Connection, actor: &Actor, id: i64, input: PatientUpdate) -> Result<PatientView, ApiError> {
    let mut patient = repository::get_patient(conn, id)?.ok_or_else(|| ApiError::not_found("Patient", id))?;

    let tc_patch = input.tc_identity_number.map(|tc| tc.trim().to_string());
    if let Some(tc) = tc_patch.value().filter(|tc| !tc.is_empty()) {
        if patient.tc_identity_number.as_deref() != Some(tc.as_str()) {
            ensure_national_id_free(conn, tc, Some(id))?;
        }
    }
    tc_patch.apply_to(&mut patient.tc_identity_number);
    patient.tc_identity_number = non_blank(patient.tc_identity_number.take());

    input.registration_number.apply_to(&mut patient.registration_number);
    input.passport_number.apply_to(&mut patient.passport_number);
    input.first_name.apply_required("first_name", &mut patient.first_name)?;
    input.last_name.apply_required("last_name", &mut patient.last_name)?;
    if patient.first_name.trim().is_empty() {
        return Err(ApiError::missing("first_name"));
    }
    if patient.last_name.trim().is_empty() {
        return Err(ApiError::missing("last_name"));
    }
    match input.birth_date {
        Patch::Absent => {}
        Patch::Null => patient.birth_date = None,
        Patch::Value(raw) => patient.birth_date = parse_birth_date(&raw)?,
    }
    input.gender.apply_required("gender", &mut patient.gender)?;
    input.mother_name.apply_to(&mut patient.mother_name);
    input.father_name.apply_to(&mut patient.father_name);
    input.mobile_phone.apply_to(&mut patient.mobile_phone);
    input.home_phone.apply_to(&mut patient.home_phone);
    input.email.apply_to(&mut patient.email);
    input.address.apply_to(&mut patient.address);
    input.notes.apply_to(&mut patient.notes);
    input.photo_url.apply_to(&mut patient.photo_url);

    // Unknown employer ids are ignored rather than rejected, as on create.
    match input.company_id {
        Patch::Absent => {}
        Patch::Null => patient.company_id = None,
        Patch::Value(company_id) => {
            if let Some(found) = existing_company(conn, Some(company_id))? {
                patient.company_id = Some(found);
            }
        }
    }
    match input.company_unit_id {
        Patch::Absent => {}
        Patch::Null => patient.company_unit_id = None,
        Patch::Value(unit_id) => {
            if let Some(found) = existing_unit(conn, Some(unit_id))? {
                patient.company_unit_id = Some(found);
            }
        }
    }

    patient.updated_at = now_timestamp();
    repository::update_patient(conn, &patient)?;
    tracing::debug!(patient_id = id, by = actor.user_id, "Patient updated");
    get(conn, id)
}

pub fn delete(conn: &Connection, actor: &Actor, id: i64) -> Result<(), ApiError> {
    actor.require_admin()?;
    repository::delete_patient(conn, id)?;
    tracing::info!(patient_id = id, by = actor.user_id, "Patient deleted");
    Ok(())
}

pub fn exists_by_national_id(conn: &Connection, tc: Option<&str>) -> Result<PatientExists, ApiError> {
    let tc = tc.map(str::trim).unwrap_or_default();
    if !is_valid_national_id(tc) {
        return Err(ApiError::BadRequest(format!(
            "tc_identity_number must be {NATIONAL_ID_LENGTH} digits"
        )));
    }
    let found = repository::get_patient_by_national_id(conn, tc)?;
    Ok(PatientExists {
        exists: found.is_some(),
        id: found.map(|p| p.id),
    })
}

pub fn is_valid_national_id(tc: &str) -> bool {
    tc.len() == NATIONAL_ID_LENGTH && tc.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn patient_view(conn: &Connection, patient: Patient) -> Result<PatientView, ApiError> {
    let company = match patient.company_id {
        Some(id) => repository::get_company(conn, id)?,
        None => None,
    };
    let company_unit = match patient.company_unit_id {
        Some(id) => repository::get_company_unit(conn, id)?,
        None => None,
    };
    Ok(PatientView {
        patient,
        company,
        company_unit,
    })
}

pub(crate) fn ensure_national_id_free(conn: &Connection, tc: &str, except: Option<i64>) -> Result<(), ApiError> {
    match repository::get_patient_by_national_id(conn, tc)? {
        Some(existing) if Some(existing.id) != except => Err(ApiError::Conflict(format!(
            "A patient with national id {tc} already exists"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_birth_date(raw: &str) -> Result<Option<chrono::NaiveDate>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date(raw)
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid birth_date: {raw}")))
}

fn existing_company(conn: &Connection, id: Option<i64>) -> Result<Option<i64>, ApiError> {
    match id {
        Some(id) => Ok(repository::get_company(conn, id)?.map(|c| c.id)),
        None => Ok(None),
    }
}

fn existing_unit(conn: &Connection, id: Option<i64>) -> Result<Option<i64>, ApiError> {
    match id {
        Some(id) => Ok(repository::get_company_unit(conn, id)?.map(|u| u.id)),
        None => Ok(None),
    }
}
