use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::patch::Patch;
use super::protocol::ProtocolWithPatient;
use super::reference::NamedEntry;

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: i64,
    pub protocol_id: i64,
    pub payment_date: NaiveDateTime,
    pub receipt_number: Option<String>,
    pub cash_register_id: Option<i64>,
    pub payment_type_id: Option<i64>,
    pub amount: f64,
    pub description: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub protocol: Option<ProtocolWithPatient>,
    pub payment_type: Option<NamedEntry>,
    pub cash_register: Option<NamedEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPayment {
    pub protocol_id: Option<i64>,
    pub payment_date: Option<String>,
    pub receipt_number: Option<String>,
    pub cash_register_id: Option<i64>,
    pub payment_type_id: Option<i64>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

/// Partial payment update. A payment stays attached to the protocol it was
/// taken for; move money by deleting and re-creating.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentUpdate {
    pub payment_date: Patch<String>,
    pub receipt_number: Patch<String>,
    pub cash_register_id: Patch<i64>,
    pub payment_type_id: Patch<i64>,
    pub amount: Patch<f64>,
    pub description: Patch<String>,
}

/// Cash report totals for a filtered set of payments.
#[derive(Debug, Clone, Serialize)]
pub struct CashSummary {
    pub count: i64,
    pub total: f64,
    pub by_payment_type: Vec<PaymentTypeTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentTypeTotal {
    pub payment_type_id: Option<i64>,
    pub payment_type_name: Option<String>,
    pub count: i64,
    pub total: f64,
}
