use rusqlite::{params, Connection, OptionalExtension, Row};

use super::enum_column;
use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str =
    "id, username, password, full_name, email, role, created_at, updated_at";

const WEB_RESULT_USER_COLUMNS: &str =
    "id, username, password, patient_id, company_id, is_active, created_at, updated_at";

pub fn insert_user(conn: &Connection, user: &User) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password, full_name, email, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.username,
            user.password_hash,
            user.full_name,
            user.email,
            user.role.as_str(),
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        email: row.get(4)?,
        role: enum_column(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn insert_web_result_user(conn: &Connection, user: &WebResultUser) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO web_result_users (username, password, patient_id, company_id, is_active,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.username,
            user.password_hash,
            user.patient_id,
            user.company_id,
            user.is_active,
            user.created_at,
            user.updated_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_web_result_user(conn: &Connection, id: i64) -> Result<Option<WebResultUser>, DatabaseError> {
    let user = conn
        .query_row(
            &format!("SELECT {WEB_RESULT_USER_COLUMNS} FROM web_result_users WHERE id = ?1"),
            params![id],
            web_result_user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_web_result_users(conn: &Connection) -> Result<Vec<WebResultUser>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WEB_RESULT_USER_COLUMNS} FROM web_result_users ORDER BY id"
    ))?;
    let users = stmt
        .query_map([], web_result_user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

fn web_result_user_from_row(row: &Row<'_>) -> rusqlite::Result<WebResultUser> {
    Ok(WebResultUser {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        patient_id: row.get(3)?,
        company_id: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
