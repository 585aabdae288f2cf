use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Account, AccountUpdate, NewAccount};
use super::errors::{map_sqlx_error, RepositoryError};
use super::storage::{AccountRow, PostgresStorage, ACCOUNT_COLUMNS};

/// Repository trait for staff accounts
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// Create a new account; duplicate usernames are a conflict
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// List accounts ordered by username
    async fn list_accounts(&self, include_archived: bool) -> Result<Vec<Account>, RepositoryError>;

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;

    /// Case-insensitive username lookup
    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    /// Apply a patch; `None` when the account does not exist
    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>, RepositoryError>;

    /// Number of accounts, archived included
    async fn count_accounts(&self) -> Result<usize, RepositoryError>;
}

#[async_trait]
impl AccountRepositoryTrait for PostgresStorage {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        debug!("Inserting account {}", account.username);

        let sql = format!(
            "INSERT INTO accounts (id, username, full_name, email, role, password_hash, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $7)
             RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let row: AccountRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.username)
            .bind(&account.full_name)
            .bind(&account.email)
            .bind(account.role.as_str())
            .bind(&account.password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn list_accounts(&self, include_archived: bool) -> Result<Vec<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE ($1 OR NOT archived) ORDER BY username",
            ACCOUNT_COLUMNS
        );

        let rows: Vec<AccountRow> = sqlx::query_as(&sql)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        super::storage::convert_rows(rows)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE LOWER(username) = LOWER($1)",
            ACCOUNT_COLUMNS
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>, RepositoryError> {
        debug!("Updating account {}", id);

        let sql = format!(
            "UPDATE accounts SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                archived = COALESCE($6, archived),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.full_name)
            .bind(&update.email)
            .bind(update.role.map(|r| r.as_str()))
            .bind(&update.password_hash)
            .bind(update.archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(Account::try_from).transpose()
    }

    async fn count_accounts(&self) -> Result<usize, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as usize)
    }
}
