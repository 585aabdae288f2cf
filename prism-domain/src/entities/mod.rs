//! Inputs and results of the domain services that have no storage
//! counterpart. Storage records themselves live in `prism_data::models`.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use prism_data::models::{PatientRecord, PaymentMethod, Role};

/// Account creation request with a plaintext password
#[derive(Debug, Clone)]
pub struct NewAccountInput {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Account changes; a password here is plaintext and gets re-hashed
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub archived: Option<bool>,
}

/// Staff input when confirming a staged appointment
#[derive(Debug, Clone)]
pub struct ConfirmStagedInput {
    pub person_in_charge: String,
    /// Defaults to the price of the requested treatment or package
    pub total_amount: Option<i64>,
    pub amount_paid: i64,
    pub payment_method: PaymentMethod,
    /// Write a sale for `amount_paid`
    pub record_sale: bool,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the requested date
    pub session_date: Option<NaiveDate>,
}

/// One page of patient records
#[derive(Debug, Clone, Serialize)]
pub struct PatientPage {
    pub records: Vec<PatientRecord>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl PatientPage {
    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.records.len()) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals {
    pub month: u32,
    pub sales: i64,
    pub expenses: i64,
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: i64,
}

/// Financial summary for a year, or one month of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialOverview {
    pub year: i32,
    pub month: Option<u32>,
    pub total_sales: i64,
    pub total_expenses: i64,
    pub net_income: i64,
    /// Always twelve entries, January first
    pub monthly: Vec<MonthlyTotals>,
    /// For the selected period, largest first
    pub expenses_by_category: Vec<CategoryTotal>,
    /// Unpaid balance across active patient records
    pub outstanding_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_page_links() {
        let page = PatientPage { records: Vec::new(), total: 45, limit: 20, offset: 20 };
        assert!(page.has_previous());
        // An empty slice at offset 20 of 45 still leaves rows after it
        assert!(page.has_next());

        let first = PatientPage { records: Vec::new(), total: 0, limit: 20, offset: 0 };
        assert!(!first.has_previous());
        assert!(!first.has_next());
    }
}
