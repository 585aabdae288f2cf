use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Category, CategoryUpdate, Expense, ExpenseFilter, ExpenseUpdate, NewCategory, NewExpense,
    NewSale, Sale, SaleFilter,
};
use super::errors::{map_sqlx_error, RepositoryError};
use super::storage::{
    convert_rows, CategoryRow, ExpenseRow, PostgresStorage, SaleRow, CATEGORY_COLUMNS,
    EXPENSE_COLUMNS, SALE_COLUMNS,
};

/// Repository trait for expense categories, expenses and sales
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait FinanceRepositoryTrait: Send + Sync {
    /// Active category names are unique, case-insensitively
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError>;

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepositoryError>;

    async fn list_categories(&self, include_archived: bool) -> Result<Vec<Category>, RepositoryError>;

    async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<Option<Category>, RepositoryError>;

    async fn set_category_archived(&self, id: Uuid, archived: bool) -> Result<Option<Category>, RepositoryError>;

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError>;

    async fn get_expense(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError>;

    /// Expenses ordered newest first
    async fn list_expenses(&self, filter: ExpenseFilter) -> Result<Vec<Expense>, RepositoryError>;

    async fn update_expense(&self, id: Uuid, update: ExpenseUpdate) -> Result<Option<Expense>, RepositoryError>;

    async fn set_expense_archived(&self, id: Uuid, archived: bool) -> Result<Option<Expense>, RepositoryError>;

    async fn create_sale(&self, sale: NewSale) -> Result<Sale, RepositoryError>;

    /// Sales ordered newest first
    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, RepositoryError>;

    /// Sum of unpaid balances over live patient records
    async fn outstanding_balance(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
impl FinanceRepositoryTrait for PostgresStorage {
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let sql = format!(
            "INSERT INTO categories (id, name, archived, created_at) VALUES ($1, $2, FALSE, $3) RETURNING {}",
            CATEGORY_COLUMNS
        );

        let row: CategoryRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&category.name)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);

        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Category::from))
    }

    async fn list_categories(&self, include_archived: bool) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM categories WHERE ($1 OR NOT archived) ORDER BY name",
            CATEGORY_COLUMNS
        );

        let rows: Vec<CategoryRow> = sqlx::query_as(&sql)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<Option<Category>, RepositoryError> {
        let sql = format!(
            "UPDATE categories SET name = COALESCE($2, name) WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        );

        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Category::from))
    }

    async fn set_category_archived(&self, id: Uuid, archived: bool) -> Result<Option<Category>, RepositoryError> {
        let sql = format!(
            "UPDATE categories SET archived = $2 WHERE id = $1 RETURNING {}",
            CATEGORY_COLUMNS
        );

        let row: Option<CategoryRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Category::from))
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError> {
        let sql = format!(
            "INSERT INTO expenses (id, category_id, description, amount, expense_date, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
             RETURNING {}",
            EXPENSE_COLUMNS
        );

        let row: ExpenseRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(expense.category_id)
            .bind(&expense.description)
            .bind(expense.amount)
            .bind(expense.expense_date)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_expense(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        let sql = format!("SELECT {} FROM expenses WHERE id = $1", EXPENSE_COLUMNS);

        let row: Option<ExpenseRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Expense::from))
    }

    async fn list_expenses(&self, filter: ExpenseFilter) -> Result<Vec<Expense>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM expenses
             WHERE ($1 OR NOT archived)
               AND ($2::DATE IS NULL OR expense_date >= $2)
               AND ($3::DATE IS NULL OR expense_date <= $3)
               AND ($4::UUID IS NULL OR category_id = $4)
             ORDER BY expense_date DESC, created_at DESC",
            EXPENSE_COLUMNS
        );

        let rows: Vec<ExpenseRow> = sqlx::query_as(&sql)
            .bind(filter.include_archived)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.category_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    async fn update_expense(&self, id: Uuid, update: ExpenseUpdate) -> Result<Option<Expense>, RepositoryError> {
        let sql = format!(
            "UPDATE expenses SET
                category_id = COALESCE($2, category_id),
                description = COALESCE($3, description),
                amount = COALESCE($4, amount),
                expense_date = COALESCE($5, expense_date),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            EXPENSE_COLUMNS
        );

        let row: Option<ExpenseRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.category_id)
            .bind(&update.description)
            .bind(update.amount)
            .bind(update.expense_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Expense::from))
    }

    async fn set_expense_archived(&self, id: Uuid, archived: bool) -> Result<Option<Expense>, RepositoryError> {
        let sql = format!(
            "UPDATE expenses SET archived = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            EXPENSE_COLUMNS
        );

        let row: Option<ExpenseRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Expense::from))
    }

    async fn create_sale(&self, sale: NewSale) -> Result<Sale, RepositoryError> {
        let sql = format!(
            "INSERT INTO sales (id, patient_record_id, appointment_id, description, amount,
                payment_method, sale_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {}",
            SALE_COLUMNS
        );

        let row: SaleRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(sale.patient_record_id)
            .bind(sale.appointment_id)
            .bind(&sale.description)
            .bind(sale.amount)
            .bind(sale.payment_method.as_str())
            .bind(sale.sale_date)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM sales
             WHERE ($1::DATE IS NULL OR sale_date >= $1)
               AND ($2::DATE IS NULL OR sale_date <= $2)
             ORDER BY sale_date DESC, created_at DESC",
            SALE_COLUMNS
        );

        let rows: Vec<SaleRow> = sqlx::query_as(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        convert_rows(rows)
    }

    async fn outstanding_balance(&self) -> Result<i64, RepositoryError> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount - amount_paid), 0)::BIGINT
             FROM patient_records WHERE NOT archived",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(balance)
    }
}
