use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{NewPackage, NewTreatment, Package, PackageUpdate, Treatment, TreatmentUpdate};
use super::errors::{map_sqlx_error, RepositoryError};
use super::storage::{PackageRow, PostgresStorage, TreatmentRow, PACKAGE_COLUMNS, TREATMENT_COLUMNS};

/// Repository trait for the treatment and package catalog
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn create_treatment(&self, treatment: NewTreatment) -> Result<Treatment, RepositoryError>;

    async fn get_treatment(&self, id: Uuid) -> Result<Option<Treatment>, RepositoryError>;

    async fn list_treatments(&self, include_archived: bool) -> Result<Vec<Treatment>, RepositoryError>;

    async fn update_treatment(
        &self,
        id: Uuid,
        update: TreatmentUpdate,
    ) -> Result<Option<Treatment>, RepositoryError>;

    async fn set_treatment_archived(&self, id: Uuid, archived: bool) -> Result<Option<Treatment>, RepositoryError>;

    async fn create_package(&self, package: NewPackage) -> Result<Package, RepositoryError>;

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, RepositoryError>;

    async fn list_packages(&self, include_archived: bool) -> Result<Vec<Package>, RepositoryError>;

    async fn update_package(&self, id: Uuid, update: PackageUpdate) -> Result<Option<Package>, RepositoryError>;

    async fn set_package_archived(&self, id: Uuid, archived: bool) -> Result<Option<Package>, RepositoryError>;
}

#[async_trait]
impl CatalogRepositoryTrait for PostgresStorage {
    async fn create_treatment(&self, treatment: NewTreatment) -> Result<Treatment, RepositoryError> {
        let sql = format!(
            "INSERT INTO treatments (id, name, description, price, duration_minutes, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
             RETURNING {}",
            TREATMENT_COLUMNS
        );

        let row: TreatmentRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&treatment.name)
            .bind(&treatment.description)
            .bind(treatment.price)
            .bind(treatment.duration_minutes)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_treatment(&self, id: Uuid) -> Result<Option<Treatment>, RepositoryError> {
        let sql = format!("SELECT {} FROM treatments WHERE id = $1", TREATMENT_COLUMNS);

        let row: Option<TreatmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Treatment::from))
    }

    async fn list_treatments(&self, include_archived: bool) -> Result<Vec<Treatment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM treatments WHERE ($1 OR NOT archived) ORDER BY name",
            TREATMENT_COLUMNS
        );

        let rows: Vec<TreatmentRow> = sqlx::query_as(&sql)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Treatment::from).collect())
    }

    async fn update_treatment(
        &self,
        id: Uuid,
        update: TreatmentUpdate,
    ) -> Result<Option<Treatment>, RepositoryError> {
        let sql = format!(
            "UPDATE treatments SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                duration_minutes = COALESCE($5, duration_minutes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            TREATMENT_COLUMNS
        );

        let row: Option<TreatmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.price)
            .bind(update.duration_minutes)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Treatment::from))
    }

    async fn set_treatment_archived(&self, id: Uuid, archived: bool) -> Result<Option<Treatment>, RepositoryError> {
        let sql = format!(
            "UPDATE treatments SET archived = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TREATMENT_COLUMNS
        );

        let row: Option<TreatmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Treatment::from))
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, RepositoryError> {
        let sql = format!(
            "INSERT INTO packages (id, name, description, price, sessions, treatment_ids, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $7)
             RETURNING {}",
            PACKAGE_COLUMNS
        );

        let row: PackageRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&package.name)
            .bind(&package.description)
            .bind(package.price)
            .bind(package.sessions)
            .bind(&package.treatment_ids)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, RepositoryError> {
        let sql = format!("SELECT {} FROM packages WHERE id = $1", PACKAGE_COLUMNS);

        let row: Option<PackageRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Package::from))
    }

    async fn list_packages(&self, include_archived: bool) -> Result<Vec<Package>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM packages WHERE ($1 OR NOT archived) ORDER BY name",
            PACKAGE_COLUMNS
        );

        let rows: Vec<PackageRow> = sqlx::query_as(&sql)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    async fn update_package(&self, id: Uuid, update: PackageUpdate) -> Result<Option<Package>, RepositoryError> {
        let sql = format!(
            "UPDATE packages SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                sessions = COALESCE($5, sessions),
                treatment_ids = COALESCE($6, treatment_ids),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PACKAGE_COLUMNS
        );

        let row: Option<PackageRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.description)
            .bind(update.price)
            .bind(update.sessions)
            .bind(&update.treatment_ids)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Package::from))
    }

    async fn set_package_archived(&self, id: Uuid, archived: bool) -> Result<Option<Package>, RepositoryError> {
        let sql = format!(
            "UPDATE packages SET archived = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PACKAGE_COLUMNS
        );

        let row: Option<PackageRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Package::from))
    }
}
