use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::dates::now_timestamp;
use crate::models::enums::SampleStatusCode;
use crate::models::*;

const SAMPLE_STATUS_COLUMNS: &str = "id, name, description, code, created_at, updated_at";

const EXTERNAL_LAB_COLUMNS: &str =
    "id, name, address, phone, email, contact_person, is_active, created_at, updated_at";

const SERVICE_COLUMNS: &str =
    "id, name, description, price, service_group_id, created_at, updated_at";

// ── Name/description lookup tables ──────────────────────────

pub fn list_named_entries(conn: &Connection, table: ReferenceTable) -> Result<Vec<NamedEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, description, created_at, updated_at FROM {} ORDER BY id",
        table.table_name()
    ))?;
    let entries = stmt
        .query_map([], named_entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub fn get_named_entry(
    conn: &Connection,
    table: ReferenceTable,
    id: i64,
) -> Result<Option<NamedEntry>, DatabaseError> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT id, name, description, created_at, updated_at FROM {} WHERE id = ?1",
                table.table_name()
            ),
            params![id],
            named_entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

pub fn insert_named_entry(
    conn: &Connection,
    table: ReferenceTable,
    name: &str,
    description: Option<&str>,
) -> Result<NamedEntry, DatabaseError> {
    let now = now_timestamp();
    conn.execute(
        &format!(
            "INSERT INTO {} (name, description, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            table.table_name()
        ),
        params![name, description, now, now],
    )?;
    Ok(NamedEntry {
        id: conn.last_insert_rowid(),
        name: name.into(),
        description: description.map(Into::into),
        created_at: now,
        updated_at: now,
    })
}

fn named_entry_from_row(row: &Row<'_>) -> rusqlite::Result<NamedEntry> {
    Ok(NamedEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

// ── Sample statuses ─────────────────────────────────────────

pub fn list_sample_statuses(conn: &Connection) -> Result<Vec<SampleStatus>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SAMPLE_STATUS_COLUMNS} FROM sample_statuses ORDER BY id"
    ))?;
    let statuses = stmt
        .query_map([], sample_status_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(statuses)
}

pub fn get_sample_status(conn: &Connection, id: i64) -> Result<Option<SampleStatus>, DatabaseError> {
    let status = conn
        .query_row(
            &format!("SELECT {SAMPLE_STATUS_COLUMNS} FROM sample_statuses WHERE id = ?1"),
            params![id],
            sample_status_from_row,
        )
        .optional()?;
    Ok(status)
}

/// Look up a well-known status by its stable code rather than its display name.
pub fn get_sample_status_by_code(
    conn: &Connection,
    code: SampleStatusCode,
) -> Result<Option<SampleStatus>, DatabaseError> {
    let status = conn
        .query_row(
            &format!("SELECT {SAMPLE_STATUS_COLUMNS} FROM sample_statuses WHERE code = ?1"),
            params![code.as_str()],
            sample_status_from_row,
        )
        .optional()?;
    Ok(status)
}

pub fn insert_sample_status(conn: &Connection, status: &SampleStatus) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO sample_statuses (name, description, code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            status.name,
            status.description,
            status.code,
            status.created_at,
            status.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn sample_status_from_row(row: &Row<'_>) -> rusqlite::Result<SampleStatus> {
    Ok(SampleStatus {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        code: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// ── External labs ───────────────────────────────────────────

pub fn list_external_labs(conn: &Connection) -> Result<Vec<ExternalLab>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EXTERNAL_LAB_COLUMNS} FROM external_labs ORDER BY id"
    ))?;
    let labs = stmt
        .query_map([], external_lab_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(labs)
}

pub fn get_external_lab(conn: &Connection, id: i64) -> Result<Option<ExternalLab>, DatabaseError> {
    let lab = conn
        .query_row(
            &format!("SELECT {EXTERNAL_LAB_COLUMNS} FROM external_labs WHERE id = ?1"),
            params![id],
            external_lab_from_row,
        )
        .optional()?;
    Ok(lab)
}

pub fn insert_external_lab(conn: &Connection, lab: &ExternalLab) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO external_labs (name, address, phone, email, contact_person, is_active,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            lab.name,
            lab.address,
            lab.phone,
            lab.email,
            lab.contact_person,
            lab.is_active,
            lab.created_at,
            lab.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn external_lab_from_row(row: &Row<'_>) -> rusqlite::Result<ExternalLab> {
    Ok(ExternalLab {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        contact_person: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ── Services ────────────────────────────────────────────────

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY id"))?;
    let services = stmt
        .query_map([], service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(services)
}

pub fn get_service(conn: &Connection, id: i64) -> Result<Option<Service>, DatabaseError> {
    let service = conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
            params![id],
            service_from_row,
        )
        .optional()?;
    Ok(service)
}

pub fn insert_service(conn: &Connection, service: &Service) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO services (name, description, price, service_group_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.name,
            service.description,
            service.price,
            service.service_group_id,
            service.created_at,
            service.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        service_group_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
