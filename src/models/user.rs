use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::Role;

/// Staff account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Portal login that lets a patient or company read its own results.
#[derive(Debug, Clone, Serialize)]
pub struct WebResultUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub patient_id: Option<i64>,
    pub company_id: Option<i64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewWebResultUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub patient_id: Option<i64>,
    pub company_id: Option<i64>,
    pub is_active: Option<bool>,
}
