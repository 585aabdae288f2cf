use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::patient::PaymentMethod;

/// Expense category (rent, supplies, payroll, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

/// Money spent by the clinic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: i64,
    pub expense_date: NaiveDate,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category_id: Uuid,
    pub description: String,
    pub amount: i64,
    pub expense_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub amount: Option<i64>,
    pub expense_date: Option<NaiveDate>,
}

impl ExpenseUpdate {
    pub fn apply_to(&self, expense: &mut Expense) {
        if let Some(v) = self.category_id {
            expense.category_id = v;
        }
        if let Some(v) = &self.description {
            expense.description = v.clone();
        }
        if let Some(v) = self.amount {
            expense.amount = v;
        }
        if let Some(v) = self.expense_date {
            expense.expense_date = v;
        }
    }
}

/// Filter for listing expenses (inclusive date bounds)
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub include_archived: bool,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if !self.include_archived && expense.archived {
            return false;
        }
        if let Some(category_id) = self.category_id {
            if expense.category_id != category_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if expense.expense_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if expense.expense_date > to {
                return false;
            }
        }
        true
    }
}

/// Money received by the clinic. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub patient_record_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub description: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub patient_record_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub description: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub sale_date: NaiveDate,
}

/// Filter for listing sales (inclusive date bounds)
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        if let Some(from) = self.from {
            if sale.sale_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if sale.sale_date > to {
                return false;
            }
        }
        true
    }
}
