use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use prism_data::models::{NewPatientRecord, PatientRecord, PatientRecordFilter, PatientRecordUpdate, PaymentMethod};

use crate::api::error::ApiError;
use crate::entities::common::{parse_field, parse_optional};

/// Patient record. Amounts are in centavos.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientResponse {
    pub id: Uuid,
    pub patient_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    /// Person In Charge
    pub person_in_charge: String,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub total_amount: i64,
    pub amount_paid: i64,
    /// `total_amount - amount_paid`
    pub remaining_balance: i64,
    pub payment_method: String,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PatientRecord> for PatientResponse {
    fn from(record: PatientRecord) -> Self {
        let remaining_balance = record.remaining_balance();
        Self {
            id: record.id,
            patient_name: record.patient_name,
            contact_number: record.contact_number,
            email: record.email,
            age: record.age,
            gender: record.gender,
            address: record.address,
            person_in_charge: record.person_in_charge,
            treatment_id: record.treatment_id,
            package_id: record.package_id,
            session_date: record.session_date,
            total_amount: record.total_amount,
            amount_paid: record.amount_paid,
            remaining_balance,
            payment_method: record.payment_method.to_string(),
            notes: record.notes,
            archived: record.archived,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientResponseBody {
    pub success: bool,
    pub patient: PatientResponse,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePatientRequest {
    #[validate(length(min = 1, max = 200, message = "Patient name is required"))]
    pub patient_name: String,
    #[validate(length(min = 1, max = 50, message = "Contact number is required"))]
    pub contact_number: String,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Person in charge is required"))]
    pub person_in_charge: String,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: NaiveDate,
    #[validate(range(min = 0, max = 100000000000, message = "Total amount must be between 0 and 100000000000 centavos"))]
    pub total_amount: i64,
    #[validate(range(min = 0, max = 100000000000, message = "Amount paid must be between 0 and 100000000000 centavos"))]
    #[serde(default)]
    pub amount_paid: i64,
    /// cash, card, bank_transfer or e_wallet
    pub payment_method: String,
    pub notes: Option<String>,
}

impl CreatePatientRequest {
    pub fn into_new(self) -> Result<NewPatientRecord, ApiError> {
        Ok(NewPatientRecord {
            payment_method: parse_field::<PaymentMethod>("payment_method", &self.payment_method)?,
            patient_name: self.patient_name,
            contact_number: self.contact_number,
            email: self.email,
            age: self.age,
            gender: self.gender,
            address: self.address,
            person_in_charge: self.person_in_charge,
            treatment_id: self.treatment_id,
            package_id: self.package_id,
            session_date: self.session_date,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            notes: self.notes,
        })
    }
}

/// Omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, max = 200, message = "Patient name cannot be empty"))]
    pub patient_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Contact number cannot be empty"))]
    pub contact_number: Option<String>,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub person_in_charge: Option<String>,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 100000000000, message = "Total amount must be between 0 and 100000000000 centavos"))]
    pub total_amount: Option<i64>,
    #[validate(range(min = 0, max = 100000000000, message = "Amount paid must be between 0 and 100000000000 centavos"))]
    pub amount_paid: Option<i64>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePatientRequest {
    pub fn into_update(self) -> Result<PatientRecordUpdate, ApiError> {
        Ok(PatientRecordUpdate {
            payment_method: parse_optional::<PaymentMethod>("payment_method", self.payment_method.as_deref())?,
            patient_name: self.patient_name,
            contact_number: self.contact_number,
            email: self.email,
            age: self.age,
            gender: self.gender,
            address: self.address,
            person_in_charge: self.person_in_charge,
            treatment_id: self.treatment_id,
            package_id: self.package_id,
            session_date: self.session_date,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            notes: self.notes,
        })
    }
}

/// Query parameters for listing patient records
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientListQuery {
    /// Matches name, contact number or email
    pub search: Option<String>,
    pub person_in_charge: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
    /// Page size (default 20, max 100)
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PatientListQuery {
    pub fn to_filter(&self) -> PatientRecordFilter {
        PatientRecordFilter {
            search: self.search.clone(),
            person_in_charge: self.person_in_charge.clone().filter(|p| !p.trim().is_empty()),
            include_archived: self.include_archived,
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Query string for another page with the same filters
    pub fn page_query(&self, limit: usize, offset: usize) -> String {
        let mut pairs = vec![format!("limit={}", limit), format!("offset={}", offset)];
        if let Some(search) = &self.search {
            pairs.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(pic) = &self.person_in_charge {
            pairs.push(format!("person_in_charge={}", urlencoding::encode(pic)));
        }
        if self.include_archived {
            pairs.push("include_archived=true".to_string());
        }
        pairs.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_keeps_filters() {
        let query = PatientListQuery {
            search: Some("maria santos".into()),
            include_archived: true,
            ..Default::default()
        };
        assert_eq!(
            query.page_query(20, 40),
            "limit=20&offset=40&search=maria%20santos&include_archived=true"
        );
    }

    #[test]
    fn test_invalid_payment_method() {
        let update = UpdatePatientRequest { payment_method: Some("barter".into()), ..Default::default() };
        assert!(matches!(update.into_update(), Err(ApiError::Validation(_))));
    }
}
