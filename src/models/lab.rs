use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::patch::Patch;
use super::protocol::{ProtocolService, ProtocolWithPatient};
use super::reference::{ExternalLab, NamedEntry, SampleStatus, Service};

pub const LAB_STATUS_PENDING: &str = "pending";
pub const LAB_STATUS_PROCESSING: &str = "processing";
pub const LAB_STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize)]
pub struct LabResult {
    pub id: i64,
    pub protocol_service_id: i64,
    pub barcode_number: Option<String>,
    pub result: Option<String>,
    pub result_text: Option<String>,
    pub reference_range: Option<String>,
    pub unit: Option<String>,
    pub is_abnormal: bool,
    pub sample_status_id: Option<i64>,
    pub rejection_reason_id: Option<i64>,
    pub external_lab_id: Option<i64>,
    pub request_date: Option<NaiveDateTime>,
    pub acceptance_date: Option<NaiveDateTime>,
    pub acceptance_by: Option<i64>,
    pub barcode_date: Option<NaiveDateTime>,
    pub approval_date: Option<NaiveDateTime>,
    pub approved_by: Option<i64>,
    pub rejection_date: Option<NaiveDateTime>,
    pub rejected_by: Option<i64>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The ordered service a lab result belongs to, with its protocol and patient.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolServiceContext {
    #[serde(flatten)]
    pub protocol_service: ProtocolService,
    pub service: Option<Service>,
    pub protocol: Option<ProtocolWithPatient>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabResultView {
    #[serde(flatten)]
    pub lab_result: LabResult,
    pub protocol_service: Option<ProtocolServiceContext>,
    pub sample_status: Option<SampleStatus>,
    pub rejection_reason: Option<NamedEntry>,
    pub external_lab: Option<ExternalLab>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewLabResult {
    pub protocol_service_id: Option<i64>,
    pub barcode_number: Option<String>,
    pub result: Option<String>,
    pub result_text: Option<String>,
    pub reference_range: Option<String>,
    pub unit: Option<String>,
    pub is_abnormal: Option<bool>,
    pub sample_status_id: Option<i64>,
    pub rejection_reason_id: Option<i64>,
    pub external_lab_id: Option<i64>,
    pub barcode_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LabResultUpdate {
    pub barcode_number: Patch<String>,
    pub result: Patch<String>,
    pub result_text: Patch<String>,
    pub reference_range: Patch<String>,
    pub unit: Patch<String>,
    pub is_abnormal: Patch<bool>,
    pub sample_status_id: Patch<i64>,
    pub rejection_reason_id: Patch<i64>,
    pub external_lab_id: Patch<i64>,
    pub barcode_date: Patch<String>,
    pub status: Patch<String>,
}
