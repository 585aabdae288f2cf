use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use prism_data::models::{
    Category, Expense, ExpenseFilter, ExpenseUpdate, NewExpense, NewSale, PaymentMethod, Sale, SaleFilter,
};
use prism_domain::entities::{CategoryTotal, FinancialOverview, MonthlyTotals};

use crate::api::error::ApiError;
use crate::entities::common::parse_field;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            archived: category.archived,
            created_at: category.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseBody {
    pub success: bool,
    pub category: CategoryResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryListResponse {
    pub success: bool,
    pub categories: Vec<CategoryResponse>,
}

/// Create or rename a category
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
}

/// Expense amounts are in centavos
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: i64,
    pub expense_date: NaiveDate,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            category_id: expense.category_id,
            description: expense.description,
            amount: expense.amount,
            expense_date: expense.expense_date,
            archived: expense.archived,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponseBody {
    pub success: bool,
    pub expense: ExpenseResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseListResponse {
    pub success: bool,
    pub expenses: Vec<ExpenseResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateExpenseRequest {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 1, max = 100000000000, message = "Amount must be between 1 and 100000000000 centavos"))]
    pub amount: i64,
    pub expense_date: NaiveDate,
}

impl From<CreateExpenseRequest> for NewExpense {
    fn from(request: CreateExpenseRequest) -> Self {
        Self {
            category_id: request.category_id,
            description: request.description,
            amount: request.amount,
            expense_date: request.expense_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateExpenseRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Description cannot be empty"))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 100000000000, message = "Amount must be between 1 and 100000000000 centavos"))]
    pub amount: Option<i64>,
    pub expense_date: Option<NaiveDate>,
}

impl From<UpdateExpenseRequest> for ExpenseUpdate {
    fn from(request: UpdateExpenseRequest) -> Self {
        Self {
            category_id: request.category_id,
            description: request.description,
            amount: request.amount,
            expense_date: request.expense_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpenseListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
}

impl From<ExpenseListQuery> for ExpenseFilter {
    fn from(query: ExpenseListQuery) -> Self {
        Self {
            from: query.from,
            to: query.to,
            category_id: query.category_id,
            include_archived: query.include_archived,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub id: Uuid,
    pub patient_record_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub description: String,
    pub amount: i64,
    pub payment_method: String,
    pub sale_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Sale> for SaleResponse {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            patient_record_id: sale.patient_record_id,
            appointment_id: sale.appointment_id,
            description: sale.description,
            amount: sale.amount,
            payment_method: sale.payment_method.to_string(),
            sale_date: sale.sale_date,
            created_at: sale.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponseBody {
    pub success: bool,
    pub sale: SaleResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleListResponse {
    pub success: bool,
    pub sales: Vec<SaleResponse>,
}

/// Manually recorded sale
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSaleRequest {
    pub patient_record_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 1, max = 100000000000, message = "Amount must be between 1 and 100000000000 centavos"))]
    pub amount: i64,
    pub payment_method: String,
    pub sale_date: NaiveDate,
}

impl CreateSaleRequest {
    pub fn into_new(self) -> Result<NewSale, ApiError> {
        Ok(NewSale {
            payment_method: parse_field::<PaymentMethod>("payment_method", &self.payment_method)?,
            patient_record_id: self.patient_record_id,
            appointment_id: None,
            description: self.description,
            amount: self.amount,
            sale_date: self.sale_date,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaleListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<SaleListQuery> for SaleFilter {
    fn from(query: SaleListQuery) -> Self {
        Self { from: query.from, to: query.to }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// 1-12; the whole year when omitted
    pub month: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTotalsResponse {
    pub month: u32,
    pub sales: i64,
    pub expenses: i64,
    pub net: i64,
}

impl From<MonthlyTotals> for MonthlyTotalsResponse {
    fn from(totals: MonthlyTotals) -> Self {
        Self {
            month: totals.month,
            sales: totals.sales,
            expenses: totals.expenses,
            net: totals.net,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotalResponse {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: i64,
}

impl From<CategoryTotal> for CategoryTotalResponse {
    fn from(total: CategoryTotal) -> Self {
        Self {
            category_id: total.category_id,
            category_name: total.category_name,
            total: total.total,
        }
    }
}

/// Sales and expenses summary; all amounts in centavos
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OverviewResponse {
    pub success: bool,
    pub year: i32,
    pub month: Option<u32>,
    pub total_sales: i64,
    pub total_expenses: i64,
    pub net_income: i64,
    pub monthly: Vec<MonthlyTotalsResponse>,
    pub expenses_by_category: Vec<CategoryTotalResponse>,
    pub outstanding_balance: i64,
}

impl From<FinancialOverview> for OverviewResponse {
    fn from(overview: FinancialOverview) -> Self {
        Self {
            success: true,
            year: overview.year,
            month: overview.month,
            total_sales: overview.total_sales,
            total_expenses: overview.total_expenses,
            net_income: overview.net_income,
            monthly: overview.monthly.into_iter().map(Into::into).collect(),
            expenses_by_category: overview.expenses_by_category.into_iter().map(Into::into).collect(),
            outstanding_balance: overview.outstanding_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_request_parses_payment_method() {
        let request = CreateSaleRequest {
            patient_record_id: None,
            description: "Walk-in facial".into(),
            amount: 150_000,
            payment_method: "e_wallet".into(),
            sale_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        };
        let sale = request.into_new().unwrap();
        assert_eq!(sale.payment_method, PaymentMethod::EWallet);
        assert!(sale.appointment_id.is_none());
    }

    #[test]
    fn test_non_positive_expense_fails_validation() {
        let request = CreateExpenseRequest {
            category_id: Uuid::new_v4(),
            description: "Gloves".into(),
            amount: 0,
            expense_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        };
        assert!(request.validate().is_err());
    }
}
