use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{enum_column, FilterQuery};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, tc_identity_number, registration_number, passport_number,
     first_name, last_name, birth_date, gender, mother_name, father_name, mobile_phone,
     home_phone, email, address, notes, photo_url, company_id, company_unit_id,
     created_at, updated_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (tc_identity_number, registration_number, passport_number,
         first_name, last_name, birth_date, gender, mother_name, father_name, mobile_phone,
         home_phone, email, address, notes, photo_url, company_id, company_unit_id,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            patient.tc_identity_number,
            patient.registration_number,
            patient.passport_number,
            patient.first_name,
            patient.last_name,
            patient.birth_date,
            patient.gender.as_str(),
            patient.mother_name,
            patient.father_name,
            patient.mobile_phone,
            patient.home_phone,
            patient.email,
            patient.address,
            patient.notes,
            patient.photo_url,
            patient.company_id,
            patient.company_unit_id,
            patient.created_at,
            patient.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn get_patient_by_national_id(conn: &Connection, tc: &str) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE tc_identity_number = ?1"),
            params![tc],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Name search is a case-insensitive substring on first or last name; a
/// national id matches only exactly.
pub fn list_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, DatabaseError> {
    let mut q = FilterQuery::new();
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let like = q.bind_contains(search);
        let exact = q.bind(search.to_string());
        q.clause(format!(
            "(first_name LIKE ?{like} COLLATE NOCASE ESCAPE '\\'
              OR last_name LIKE ?{like} COLLATE NOCASE ESCAPE '\\'
              OR tc_identity_number = ?{exact})"
        ));
    }
    q.eq("company_id", filter.company_id);

    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients{} ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE, id",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let patients = stmt
        .query_map(q.param_refs().as_slice(), patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patients)
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET tc_identity_number = ?1, registration_number = ?2,
         passport_number = ?3, first_name = ?4, last_name = ?5, birth_date = ?6, gender = ?7,
         mother_name = ?8, father_name = ?9, mobile_phone = ?10, home_phone = ?11, email = ?12,
         address = ?13, notes = ?14, photo_url = ?15, company_id = ?16, company_unit_id = ?17,
         updated_at = ?18
         WHERE id = ?19",
        params![
            patient.tc_identity_number,
            patient.registration_number,
            patient.passport_number,
            patient.first_name,
            patient.last_name,
            patient.birth_date,
            patient.gender.as_str(),
            patient.mother_name,
            patient.father_name,
            patient.mobile_phone,
            patient.home_phone,
            patient.email,
            patient.address,
            patient.notes,
            patient.photo_url,
            patient.company_id,
            patient.company_unit_id,
            patient.updated_at,
            patient.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", patient.id));
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub(crate) fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        tc_identity_number: row.get(1)?,
        registration_number: row.get(2)?,
        passport_number: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        birth_date: row.get(6)?,
        gender: enum_column(row, 7)?,
        mother_name: row.get(8)?,
        father_name: row.get(9)?,
        mobile_phone: row.get(10)?,
        home_phone: row.get(11)?,
        email: row.get(12)?,
        address: row.get(13)?,
        notes: row.get(14)?,
        photo_url: row.get(15)?,
        company_id: row.get(16)?,
        company_unit_id: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}
