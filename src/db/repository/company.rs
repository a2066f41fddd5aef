use rusqlite::{params, Connection, OptionalExtension, Row};

use super::FilterQuery;
use crate::db::DatabaseError;
use crate::models::*;

const COMPANY_COLUMNS: &str = "id, name, tax_number, address, phone, email, contact_person,
     is_active, created_at, updated_at";

const UNIT_COLUMNS: &str = "id, company_id, name, address, phone, created_at, updated_at";

pub fn insert_company(conn: &Connection, company: &Company) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO companies (name, tax_number, address, phone, email, contact_person,
         is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            company.name,
            company.tax_number,
            company.address,
            company.phone,
            company.email,
            company.contact_person,
            company.is_active,
            company.created_at,
            company.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_company(conn: &Connection, id: i64) -> Result<Option<Company>, DatabaseError> {
    let company = conn
        .query_row(
            &format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = ?1"),
            params![id],
            company_from_row,
        )
        .optional()?;
    Ok(company)
}

pub fn list_companies(conn: &Connection, filter: &CompanyFilter) -> Result<Vec<Company>, DatabaseError> {
    let mut q = FilterQuery::new();
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let idx = q.bind_contains(search);
        q.clause(format!("name LIKE ?{idx} COLLATE NOCASE ESCAPE '\\'"));
    }
    q.eq("is_active", filter.is_active);

    let sql = format!(
        "SELECT {COMPANY_COLUMNS} FROM companies{} ORDER BY name COLLATE NOCASE, id",
        q.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let companies = stmt
        .query_map(q.param_refs().as_slice(), company_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(companies)
}

pub fn update_company(conn: &Connection, company: &Company) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE companies SET name = ?1, tax_number = ?2, address = ?3, phone = ?4, email = ?5,
         contact_person = ?6, is_active = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            company.name,
            company.tax_number,
            company.address,
            company.phone,
            company.email,
            company.contact_person,
            company.is_active,
            company.updated_at,
            company.id,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Company", company.id));
    }
    Ok(())
}

pub fn delete_company(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    // Units belong to the company; patients and protocols still pointing at
    // it make the delete fail on the foreign key.
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM company_units WHERE company_id = ?1", params![id])?;
    let deleted = tx.execute("DELETE FROM companies WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("Company", id));
    }
    tx.commit()?;
    Ok(())
}

pub fn insert_company_unit(conn: &Connection, unit: &CompanyUnit) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO company_units (company_id, name, address, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            unit.company_id,
            unit.name,
            unit.address,
            unit.phone,
            unit.created_at,
            unit.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_company_unit(conn: &Connection, id: i64) -> Result<Option<CompanyUnit>, DatabaseError> {
    let unit = conn
        .query_row(
            &format!("SELECT {UNIT_COLUMNS} FROM company_units WHERE id = ?1"),
            params![id],
            unit_from_row,
        )
        .optional()?;
    Ok(unit)
}

pub fn list_company_units(conn: &Connection, company_id: i64) -> Result<Vec<CompanyUnit>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {UNIT_COLUMNS} FROM company_units WHERE company_id = ?1 ORDER BY name COLLATE NOCASE, id"
    ))?;
    let units = stmt
        .query_map(params![company_id], unit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(units)
}

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        tax_number: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        contact_person: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<CompanyUnit> {
    Ok(CompanyUnit {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures;
    use crate::db::sqlite::open_memory_database;
    use crate::models::dates::now_timestamp;

    fn unit(conn: &Connection, company_id: i64, name: &str) -> CompanyUnit {
        let now = now_timestamp();
        let id = insert_company_unit(
            conn,
            &CompanyUnit {
                id: 0,
                company_id,
                name: name.into(),
                address: None,
                phone: None,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        get_company_unit(conn, id).unwrap().unwrap()
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let conn = open_memory_database().unwrap();
        fixtures::company(&conn, "Demir Çelik A.Ş.");
        fixtures::company(&conn, "Anadolu Tekstil");

        let found = list_companies(
            &conn,
            &CompanyFilter {
                search: Some("tekstil".into()),
                is_active: None,
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Anadolu Tekstil");
    }

    #[test]
    fn percent_in_search_is_literal() {
        let conn = open_memory_database().unwrap();
        fixtures::company(&conn, "Yüzde 100% Gıda");
        fixtures::company(&conn, "Anadolu Tekstil");

        let found = list_companies(
            &conn,
            &CompanyFilter {
                search: Some("100%".into()),
                is_active: None,
            },
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Yüzde 100% Gıda");

        let percent_only = list_companies(
            &conn,
            &CompanyFilter {
                search: Some("%".into()),
                is_active: None,
            },
        )
        .unwrap();
        assert_eq!(percent_only.len(), 1);
    }

    #[test]
    fn is_active_filter() {
        let conn = open_memory_database().unwrap();
        let mut inactive = fixtures::company(&conn, "Kapalı Ltd");
        fixtures::company(&conn, "Açık Ltd");
        inactive.is_active = false;
        update_company(&conn, &inactive).unwrap();

        let active = list_companies(
            &conn,
            &CompanyFilter {
                search: None,
                is_active: Some(true),
            },
        )
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Açık Ltd");
    }

    #[test]
    fn units_are_listed_per_company() {
        let conn = open_memory_database().unwrap();
        let a = fixtures::company(&conn, "A");
        let b = fixtures::company(&conn, "B");
        unit(&conn, a.id, "Üretim");
        unit(&conn, a.id, "Depo");
        unit(&conn, b.id, "Ofis");

        let units = list_company_units(&conn, a.id).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "Depo");
    }

    #[test]
    fn delete_company_removes_units() {
        let conn = open_memory_database().unwrap();
        let company = fixtures::company(&conn, "A");
        unit(&conn, company.id, "Depo");
        delete_company(&conn, company.id).unwrap();
        assert!(get_company(&conn, company.id).unwrap().is_none());
        assert!(list_company_units(&conn, company.id).unwrap().is_empty());
    }

    #[test]
    fn delete_missing_company_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = delete_company(&conn, 99).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
