//! Employer companies and their units.

use rusqlite::Connection;

use crate::accounts::Actor;
use crate::api::error::{required_text, ApiError};
use crate::db::repository;
use crate::models::dates::now_timestamp;
use crate::models::*;

pub fn list(conn: &Connection, filter: &CompanyFilter) -> Result<Vec<CompanyWithUnits>, ApiError> {
    repository::list_companies(conn, filter)?
        .into_iter()
        .map(|company| with_units(conn, company))
        .collect()
}

pub fn get(conn: &Connection, id: i64) -> Result<CompanyWithUnits, ApiError> {
    with_units(conn, find(conn, id)?)
}

pub fn create(conn: &Connection, actor: &Actor, input: NewCompany) -> Result<CompanyWithUnits, ApiError> {
    let now = now_timestamp();
    let company = Company {
        id: 0,
        name: required_text(input.name, "name")?,
        tax_number: input.tax_number,
        address: input.address,
        phone: input.phone,
        email: input.email,
        contact_person: input.contact_person,
        is_active: input.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_company(conn, &company)?;
    tracing::info!(company_id = id, by = actor.user_id, "Company created");
    get(conn, id)
}

pub fn update(conn: &Connection, actor: &Actor, id: i64, input: CompanyUpdate) -> Result<CompanyWithUnits, ApiError> {
    let mut company = find(conn, id)?;
    input.name.apply_required("name", &mut company.name)?;
    if company.name.trim().is_empty() {
        return Err(ApiError::missing("name"));
    }
    input.tax_number.apply_to(&mut company.tax_number);
    input.address.apply_to(&mut company.address);
    input.phone.apply_to(&mut company.phone);
    input.email.apply_to(&mut company.email);
    input.contact_person.apply_to(&mut company.contact_person);
    input.is_active.apply_required("is_active", &mut company.is_active)?;
    company.updated_at = now_timestamp();

    repository::update_company(conn, &company)?;
    tracing::debug!(company_id = id, by = actor.user_id, "Company updated");
    get(conn, id)
}

/// Removes the company with its units. Companies still referenced by
/// patients or protocols are refused with a conflict.
pub fn delete(conn: &Connection, actor: &Actor, id: i64) -> Result<(), ApiError> {
    actor.require_admin()?;
    repository::delete_company(conn, id)?;
    tracing::info!(company_id = id, by = actor.user_id, "Company deleted");
    Ok(())
}

pub fn list_units(conn: &Connection, company_id: i64) -> Result<Vec<CompanyUnit>, ApiError> {
    find(conn, company_id)?;
    Ok(repository::list_company_units(conn, company_id)?)
}

pub fn create_unit(
    conn: &Connection,
    actor: &Actor,
    company_id: i64,
    input: NewCompanyUnit,
) -> Result<CompanyUnit, ApiError> {
    find(conn, company_id)?;
    let now = now_timestamp();
    let unit = CompanyUnit {
        id: 0,
        company_id,
        name: required_text(input.name, "name")?,
        address: input.address,
        phone: input.phone,
        created_at: now,
        updated_at: now,
    };
    let id = repository::insert_company_unit(conn, &unit)?;
    tracing::debug!(company_id, unit_id = id, by = actor.user_id, "Company unit created");
    repository::get_company_unit(conn, id)?.ok_or_else(|| ApiError::not_found("CompanyUnit", id))
}

fn find(conn: &Connection, id: i64) -> Result<Company, ApiError> {
    repository::get_company(conn, id)?.ok_or_else(|| ApiError::not_found("Company", id))
}

fn with_units(conn: &Connection, company: Company) -> Result<CompanyWithUnits, ApiError> {
    let units = repository::list_company_units(conn, company.id)?;
    Ok(CompanyWithUnits { company, units })
}
