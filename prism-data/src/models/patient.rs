use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a patient settled (part of) their bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    EWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::EWallet => "e_wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "e_wallet" | "ewallet" | "gcash" => Ok(PaymentMethod::EWallet),
            other => Err(format!("invalid payment method: {}", other)),
        }
    }
}

/// Storage model for a patient record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: Uuid,
    pub patient_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    /// Person In Charge: the staff member assigned to the treatment
    pub person_in_charge: String,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub total_amount: i64,
    pub amount_paid: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Amount still owed by the patient
    pub fn remaining_balance(&self) -> i64 {
        self.total_amount - self.amount_paid
    }
}

/// Input data for creating a patient record
#[derive(Debug, Clone)]
pub struct NewPatientRecord {
    pub patient_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub person_in_charge: String,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: NaiveDate,
    pub total_amount: i64,
    pub amount_paid: i64,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Partial update of a patient record; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct PatientRecordUpdate {
    pub patient_name: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub person_in_charge: Option<String>,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub session_date: Option<NaiveDate>,
    pub total_amount: Option<i64>,
    pub amount_paid: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl PatientRecordUpdate {
    /// Apply the patch to a record in place
    pub fn apply_to(&self, record: &mut PatientRecord) {
        if let Some(v) = &self.patient_name {
            record.patient_name = v.clone();
        }
        if let Some(v) = &self.contact_number {
            record.contact_number = v.clone();
        }
        if let Some(v) = &self.email {
            record.email = Some(v.clone());
        }
        if let Some(v) = self.age {
            record.age = Some(v);
        }
        if let Some(v) = &self.gender {
            record.gender = Some(v.clone());
        }
        if let Some(v) = &self.address {
            record.address = Some(v.clone());
        }
        if let Some(v) = &self.person_in_charge {
            record.person_in_charge = v.clone();
        }
        if let Some(v) = self.treatment_id {
            record.treatment_id = Some(v);
        }
        if let Some(v) = self.package_id {
            record.package_id = Some(v);
        }
        if let Some(v) = self.session_date {
            record.session_date = v;
        }
        if let Some(v) = self.total_amount {
            record.total_amount = v;
        }
        if let Some(v) = self.amount_paid {
            record.amount_paid = v;
        }
        if let Some(v) = self.payment_method {
            record.payment_method = v;
        }
        if let Some(v) = &self.notes {
            record.notes = Some(v.clone());
        }
    }
}

/// Filter for listing patient records
#[derive(Debug, Clone, Default)]
pub struct PatientRecordFilter {
    /// Case-insensitive match on patient name, contact number or email
    pub search: Option<String>,
    pub person_in_charge: Option<String>,
    pub include_archived: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PatientRecordFilter {
    /// Whether a record passes the non-paging part of the filter
    pub fn matches(&self, record: &PatientRecord) -> bool {
        if !self.include_archived && record.archived {
            return false;
        }

        if let Some(pic) = &self.person_in_charge {
            if !record.person_in_charge.eq_ignore_ascii_case(pic) {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = record.patient_name.to_lowercase().contains(&needle)
                || record.contact_number.to_lowercase().contains(&needle)
                || record
                    .email
                    .as_deref()
                    .map(|e| e.to_lowercase().contains(&needle))
                    .unwrap_or(false);
            if !hit {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientRecord {
        PatientRecord {
            id: Uuid::new_v4(),
            patient_name: "Maria Santos".to_string(),
            contact_number: "09171234567".to_string(),
            email: Some("maria@example.com".to_string()),
            age: Some(34),
            gender: Some("female".to_string()),
            address: None,
            person_in_charge: "Dr. Reyes".to_string(),
            treatment_id: None,
            package_id: None,
            session_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total_amount: 250_000,
            amount_paid: 100_000,
            payment_method: PaymentMethod::Cash,
            notes: None,
            archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_balance() {
        assert_eq!(sample().remaining_balance(), 150_000);
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("e-wallet".parse::<PaymentMethod>().unwrap(), PaymentMethod::EWallet);
        assert_eq!("Bank Transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let record = sample();

        let filter = PatientRecordFilter { search: Some("santos".into()), ..Default::default() };
        assert!(filter.matches(&record));

        let filter = PatientRecordFilter { search: Some("0917".into()), ..Default::default() };
        assert!(filter.matches(&record));

        let filter = PatientRecordFilter { person_in_charge: Some("dr. reyes".into()), ..Default::default() };
        assert!(filter.matches(&record));

        let filter = PatientRecordFilter { search: Some("cruz".into()), ..Default::default() };
        assert!(!filter.matches(&record));

        let mut archived = sample();
        archived.archived = true;
        assert!(!PatientRecordFilter::default().matches(&archived));
        assert!(PatientRecordFilter { include_archived: true, ..Default::default() }.matches(&archived));
    }

    #[test]
    fn test_update_apply() {
        let mut record = sample();
        let update = PatientRecordUpdate {
            amount_paid: Some(250_000),
            notes: Some("paid in full".into()),
            ..Default::default()
        };
        update.apply_to(&mut record);

        assert_eq!(record.remaining_balance(), 0);
        assert_eq!(record.notes.as_deref(), Some("paid in full"));
        assert_eq!(record.patient_name, "Maria Santos");
    }
}
