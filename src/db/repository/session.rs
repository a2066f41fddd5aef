use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::user::user_from_row;
use crate::db::DatabaseError;
use crate::models::User;

/// Store the SHA-256 hex of a freshly issued bearer token.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: i64,
    created_at: NaiveDateTime,
    expires_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO auth_sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id, created_at, expires_at],
    )?;
    Ok(())
}

/// Resolve a token hash to its user and expiry.
pub fn get_session_user(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<(User, NaiveDateTime)>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT u.id, u.username, u.password, u.full_name, u.email, u.role,
                    u.created_at, u.updated_at, s.expires_at
             FROM auth_sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1",
            params![token_hash],
            |row| Ok((user_from_row(row)?, row.get::<_, NaiveDateTime>(8)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn delete_expired_sessions(conn: &Connection, now: NaiveDateTime) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM auth_sessions WHERE expires_at <= ?1",
        params![now],
    )?;
    Ok(removed)
}
