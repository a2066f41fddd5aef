use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Row of any plain name/description lookup table.
#[derive(Debug, Clone, Serialize)]
pub struct NamedEntry {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The lookup tables that share the [`NamedEntry`] shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTable {
    ExaminationTypes,
    ServiceGroups,
    PaymentTypes,
    CashRegisters,
    SampleRejectionReasons,
}

impl ReferenceTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::ExaminationTypes => "examination_types",
            Self::ServiceGroups => "service_groups",
            Self::PaymentTypes => "payment_types",
            Self::CashRegisters => "cash_registers",
            Self::SampleRejectionReasons => "sample_rejection_reasons",
        }
    }

    /// Human-readable entity name for not-found messages.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::ExaminationTypes => "ExaminationType",
            Self::ServiceGroups => "ServiceGroup",
            Self::PaymentTypes => "PaymentType",
            Self::CashRegisters => "CashRegister",
            Self::SampleRejectionReasons => "SampleRejectionReason",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewNamedEntry {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleStatus {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewSampleStatus {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExternalLab {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewExternalLab {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub is_active: Option<bool>,
}

/// Billable catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub service_group_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewService {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub service_group_id: Option<i64>,
}
