use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const SUBMISSION_STATUS_SUBMITTED: &str = "submitted";

/// A sample sent out to a partner laboratory.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalLabSubmission {
    pub id: i64,
    pub protocol_service_id: i64,
    pub external_lab_id: i64,
    pub submission_date: NaiveDateTime,
    pub expected_return_date: Option<NaiveDateTime>,
    pub return_date: Option<NaiveDateTime>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewExternalLabSubmission {
    pub protocol_service_id: Option<i64>,
    pub external_lab_id: Option<i64>,
    pub submission_date: Option<String>,
    pub expected_return_date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}
