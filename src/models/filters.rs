use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct PatientFilter {
    pub search: Option<String>,
    pub company_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct CompanyFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// Date bounds are inclusive and compare against the calendar date only.
#[derive(Debug, Default)]
pub struct ProtocolFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub patient_id: Option<i64>,
    pub company_id: Option<i64>,
    pub examination_type_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Default)]
pub struct PaymentFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub protocol_id: Option<i64>,
    pub payment_type_id: Option<i64>,
    pub cash_register_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct LabResultFilter {
    pub protocol_service_id: Option<i64>,
    pub sample_status_id: Option<i64>,
    pub barcode_number: Option<String>,
    pub status: Option<String>,
    pub external_lab_id: Option<i64>,
}
