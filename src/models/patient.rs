use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::company::{Company, CompanyUnit};
use super::enums::Gender;
use super::patch::Patch;

#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: i64,
    pub tc_identity_number: Option<String>,
    pub registration_number: Option<String>,
    pub passport_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub mobile_phone: Option<String>,
    pub home_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub company_id: Option<i64>,
    pub company_unit_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Patient with its employer and unit resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    #[serde(flatten)]
    pub patient: Patient,
    pub company: Option<Company>,
    pub company_unit: Option<CompanyUnit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPatient {
    pub tc_identity_number: Option<String>,
    pub registration_number: Option<String>,
    pub passport_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub mother_name: Option<String>,
    pub father_name: Option<String>,
    pub mobile_phone: Option<String>,
    pub home_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub company_id: Option<i64>,
    pub company_unit_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatientUpdate {
    pub tc_identity_number: Patch<String>,
    pub registration_number: Patch<String>,
    pub passport_number: Patch<String>,
    pub first_name: Patch<String>,
    pub last_name: Patch<String>,
    pub birth_date: Patch<String>,
    pub gender: Patch<Gender>,
    pub mother_name: Patch<String>,
    pub father_name: Patch<String>,
    pub mobile_phone: Patch<String>,
    pub home_phone: Patch<String>,
    pub email: Patch<String>,
    pub address: Patch<String>,
    pub notes: Patch<String>,
    pub photo_url: Patch<String>,
    pub company_id: Patch<i64>,
    pub company_unit_id: Patch<i64>,
}

/// Answer of the national-id existence probe.
#[derive(Debug, Serialize)]
pub struct PatientExists {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}
