use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::info;
use uuid::Uuid;

use prism_data::models::{
    Category, CategoryUpdate, Expense, ExpenseFilter, ExpenseUpdate, NewCategory, NewExpense, NewSale,
    Sale, SaleFilter, MAX_AMOUNT,
};
use prism_data::repository::FinanceRepositoryTrait;

use crate::entities::{CategoryTotal, FinancialOverview, MonthlyTotals};
use crate::error::{ServiceError, ServiceResult};
use crate::services::require_text;

#[async_trait]
pub trait FinanceServiceTrait: Send + Sync {
    async fn create_category(&self, name: &str) -> ServiceResult<Category>;

    async fn list_categories(&self, include_archived: bool) -> ServiceResult<Vec<Category>>;

    async fn rename_category(&self, id: Uuid, name: &str) -> ServiceResult<Category>;

    async fn set_category_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Category>;

    async fn create_expense(&self, expense: NewExpense) -> ServiceResult<Expense>;

    async fn list_expenses(&self, filter: ExpenseFilter) -> ServiceResult<Vec<Expense>>;

    async fn update_expense(&self, id: Uuid, update: ExpenseUpdate) -> ServiceResult<Expense>;

    async fn set_expense_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Expense>;

    async fn record_sale(&self, sale: NewSale) -> ServiceResult<Sale>;

    async fn list_sales(&self, filter: SaleFilter) -> ServiceResult<Vec<Sale>>;

    /// Totals for `year`, or for one month of it when `month` is given
    async fn overview(&self, year: i32, month: Option<u32>) -> ServiceResult<FinancialOverview>;
}

pub struct FinanceService<F: FinanceRepositoryTrait> {
    repository: F,
}

impl<F: FinanceRepositoryTrait> FinanceService<F> {
    pub fn new(repository: F) -> Self {
        Self { repository }
    }

    async fn ensure_active_category(&self, id: Uuid) -> ServiceResult<()> {
        match self.repository.get_category(id).await? {
            Some(category) if !category.archived => Ok(()),
            Some(_) => Err(ServiceError::Validation(format!("Category {} is archived", id))),
            None => Err(ServiceError::Validation(format!("Category {} does not exist", id))),
        }
    }
}

fn validate_amount(field: &str, amount: i64) -> ServiceResult<()> {
    if !(1..=MAX_AMOUNT).contains(&amount) {
        return Err(ServiceError::Validation(format!(
            "{} must be between 1 and {} centavos",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Narrow a widened total back to `i64`
fn to_amount(total: i128) -> ServiceResult<i64> {
    i64::try_from(total)
        .map_err(|_| ServiceError::Validation("Totals are too large to report".to_string()))
}

fn year_bounds(year: i32) -> ServiceResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    first
        .zip(last)
        .ok_or_else(|| ServiceError::Validation(format!("Invalid year {}", year)))
}

/// Build the overview from already-loaded rows.
///
/// `sales` and `expenses` should cover the whole year; archived expenses are
/// skipped here as well. Sums are taken in `i128` so oversized totals are
/// reported as a validation error instead of wrapping.
pub fn compute_overview(
    year: i32,
    month: Option<u32>,
    sales: &[Sale],
    expenses: &[Expense],
    categories: &[Category],
    outstanding_balance: i64,
) -> ServiceResult<FinancialOverview> {
    let in_year = |date: NaiveDate| date.year() == year;
    let in_period = |date: NaiveDate| in_year(date) && month.map_or(true, |m| date.month() == m);

    let mut monthly_sales = [0i128; 12];
    let mut monthly_expenses = [0i128; 12];
    for sale in sales.iter().filter(|s| in_year(s.sale_date)) {
        monthly_sales[sale.sale_date.month0() as usize] += i128::from(sale.amount);
    }
    let live_expenses: Vec<&Expense> = expenses
        .iter()
        .filter(|e| !e.archived && in_year(e.expense_date))
        .collect();
    for expense in &live_expenses {
        monthly_expenses[expense.expense_date.month0() as usize] += i128::from(expense.amount);
    }

    let monthly = (0..12)
        .map(|i| -> ServiceResult<MonthlyTotals> {
            Ok(MonthlyTotals {
                month: i as u32 + 1,
                sales: to_amount(monthly_sales[i])?,
                expenses: to_amount(monthly_expenses[i])?,
                net: to_amount(monthly_sales[i] - monthly_expenses[i])?,
            })
        })
        .collect::<ServiceResult<Vec<_>>>()?;

    let total_sales: i128 = sales
        .iter()
        .filter(|s| in_period(s.sale_date))
        .map(|s| i128::from(s.amount))
        .sum();

    let names: HashMap<Uuid, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut by_category: HashMap<Uuid, i128> = HashMap::new();
    for expense in live_expenses.iter().filter(|e| in_period(e.expense_date)) {
        *by_category.entry(expense.category_id).or_insert(0) += i128::from(expense.amount);
    }
    let total_expenses: i128 = by_category.values().sum();

    let mut expenses_by_category = by_category
        .into_iter()
        .map(|(category_id, total)| -> ServiceResult<CategoryTotal> {
            Ok(CategoryTotal {
                category_id,
                category_name: names.get(&category_id).copied().unwrap_or("Uncategorized").to_string(),
                total: to_amount(total)?,
            })
        })
        .collect::<ServiceResult<Vec<_>>>()?;
    expenses_by_category.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category_name.cmp(&b.category_name)));

    Ok(FinancialOverview {
        year,
        month,
        total_sales: to_amount(total_sales)?,
        total_expenses: to_amount(total_expenses)?,
        net_income: to_amount(total_sales - total_expenses)?,
        monthly,
        expenses_by_category,
        outstanding_balance,
    })
}

#[async_trait]
impl<F: FinanceRepositoryTrait> FinanceServiceTrait for FinanceService<F> {
    async fn create_category(&self, name: &str) -> ServiceResult<Category> {
        let name = require_text("name", name)?;
        let category = self.repository.create_category(NewCategory { name }).await?;
        info!("Created expense category {}", category.name);
        Ok(category)
    }

    async fn list_categories(&self, include_archived: bool) -> ServiceResult<Vec<Category>> {
        Ok(self.repository.list_categories(include_archived).await?)
    }

    async fn rename_category(&self, id: Uuid, name: &str) -> ServiceResult<Category> {
        let name = require_text("name", name)?;
        self.repository
            .update_category(id, CategoryUpdate { name: Some(name) })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    async fn set_category_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Category> {
        self.repository
            .set_category_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    async fn create_expense(&self, mut expense: NewExpense) -> ServiceResult<Expense> {
        expense.description = require_text("description", &expense.description)?;
        validate_amount("amount", expense.amount)?;
        self.ensure_active_category(expense.category_id).await?;

        Ok(self.repository.create_expense(expense).await?)
    }

    async fn list_expenses(&self, filter: ExpenseFilter) -> ServiceResult<Vec<Expense>> {
        Ok(self.repository.list_expenses(filter).await?)
    }

    async fn update_expense(&self, id: Uuid, mut update: ExpenseUpdate) -> ServiceResult<Expense> {
        if let Some(description) = &update.description {
            update.description = Some(require_text("description", description)?);
        }
        if let Some(amount) = update.amount {
            validate_amount("amount", amount)?;
        }
        if let Some(category_id) = update.category_id {
            self.ensure_active_category(category_id).await?;
        }

        self.repository
            .update_expense(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Expense {} not found", id)))
    }

    async fn set_expense_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Expense> {
        self.repository
            .set_expense_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Expense {} not found", id)))
    }

    async fn record_sale(&self, mut sale: NewSale) -> ServiceResult<Sale> {
        sale.description = require_text("description", &sale.description)?;
        validate_amount("amount", sale.amount)?;
        Ok(self.repository.create_sale(sale).await?)
    }

    async fn list_sales(&self, filter: SaleFilter) -> ServiceResult<Vec<Sale>> {
        Ok(self.repository.list_sales(filter).await?)
    }

    async fn overview(&self, year: i32, month: Option<u32>) -> ServiceResult<FinancialOverview> {
        if matches!(month, Some(m) if !(1..=12).contains(&m)) {
            return Err(ServiceError::Validation("month must be between 1 and 12".to_string()));
        }
        let (first, last) = year_bounds(year)?;

        let sales = self
            .repository
            .list_sales(SaleFilter { from: Some(first), to: Some(last) })
            .await?;
        let expenses = self
            .repository
            .list_expenses(ExpenseFilter {
                from: Some(first),
                to: Some(last),
                category_id: None,
                include_archived: false,
            })
            .await?;
        let categories = self.repository.list_categories(true).await?;
        let outstanding = self.repository.outstanding_balance().await?;

        compute_overview(year, month, &sales, &expenses, &categories, outstanding)
    }
}
