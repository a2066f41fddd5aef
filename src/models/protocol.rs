use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::company::Company;
use super::patch::Patch;
use super::patient::Patient;
use super::payment::Payment;
use super::reference::{NamedEntry, Service};

pub const PROTOCOL_STATUS_ACTIVE: &str = "active";

/// One clinic visit and its bill.
#[derive(Debug, Clone, Serialize)]
pub struct Protocol {
    pub id: i64,
    pub protocol_number: String,
    pub patient_id: i64,
    pub examination_type_id: i64,
    pub company_id: Option<i64>,
    pub protocol_date: NaiveDateTime,
    pub receipt_number: Option<String>,
    pub ledger_number: Option<String>,
    pub total_amount: f64,
    pub discount_amount: f64,
    pub paid_amount: f64,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A service ordered on a protocol, priced at order time.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolService {
    pub id: i64,
    pub protocol_id: i64,
    pub service_id: i64,
    pub price: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolServiceView {
    #[serde(flatten)]
    pub protocol_service: ProtocolService,
    pub service: Option<Service>,
}

/// Protocol with its relations. `payments` is only loaded for single-protocol reads.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolView {
    #[serde(flatten)]
    pub protocol: Protocol,
    pub patient: Option<Patient>,
    pub examination_type: Option<NamedEntry>,
    pub company: Option<Company>,
    pub services: Vec<ProtocolServiceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProtocolWithPatient {
    #[serde(flatten)]
    pub protocol: Protocol,
    pub patient: Option<Patient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewProtocol {
    pub patient_id: Option<i64>,
    pub examination_type_id: Option<i64>,
    pub company_id: Option<i64>,
    pub protocol_date: Option<String>,
    pub receipt_number: Option<String>,
    pub ledger_number: Option<String>,
    pub total_amount: Option<f64>,
    pub discount_amount: Option<f64>,
    pub services: Vec<ServiceOrder>,
}

/// Entry of the `services` list on protocol creation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceOrder {
    pub service_id: Option<i64>,
    pub price: Option<f64>,
}

/// A `services` entry that was not attached.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedService {
    pub index: usize,
    pub service_id: Option<i64>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedProtocol {
    #[serde(flatten)]
    pub protocol: ProtocolView,
    pub skipped_services: Vec<SkippedService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProtocolUpdate {
    pub examination_type_id: Patch<i64>,
    pub company_id: Patch<i64>,
    pub protocol_date: Patch<String>,
    pub receipt_number: Patch<String>,
    pub ledger_number: Patch<String>,
    pub total_amount: Patch<f64>,
    pub discount_amount: Patch<f64>,
    pub status: Patch<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewProtocolService {
    pub protocol_id: Option<i64>,
    pub service_id: Option<i64>,
    pub price: Option<f64>,
}
