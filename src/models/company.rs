use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::patch::Patch;

#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub tax_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyUnit {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyWithUnits {
    #[serde(flatten)]
    pub company: Company,
    pub units: Vec<CompanyUnit>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewCompany {
    pub name: Option<String>,
    pub tax_number: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyUpdate {
    pub name: Patch<String>,
    pub tax_number: Patch<String>,
    pub address: Patch<String>,
    pub phone: Patch<String>,
    pub email: Patch<String>,
    pub contact_person: Patch<String>,
    pub is_active: Patch<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewCompanyUnit {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}
