use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{NewPatientRecord, PatientRecord, PatientRecordFilter, PatientRecordUpdate};
use super::errors::{map_sqlx_error, RepositoryError};
use super::storage::{convert_rows, PatientRow, PostgresStorage, PATIENT_COLUMNS};

/// Repository trait for patient records
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PatientRepositoryTrait: Send + Sync {
    async fn create_patient(&self, record: NewPatientRecord) -> Result<PatientRecord, RepositoryError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError>;

    /// One page of matching records, newest session first, plus the total match count
    async fn list_patients(
        &self,
        filter: PatientRecordFilter,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError>;

    async fn update_patient(
        &self,
        id: Uuid,
        update: PatientRecordUpdate,
    ) -> Result<Option<PatientRecord>, RepositoryError>;

    /// Soft-delete or restore a record
    async fn set_patient_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<PatientRecord>, RepositoryError>;
}

/// Shared WHERE clause for the list and count queries
const PATIENT_FILTER: &str = "($1 OR NOT archived)
     AND ($2::TEXT IS NULL OR LOWER(person_in_charge) = LOWER($2))
     AND ($3::TEXT IS NULL
          OR LOWER(patient_name) LIKE $3 ESCAPE '\\'
          OR LOWER(contact_number) LIKE $3 ESCAPE '\\'
          OR LOWER(COALESCE(email, '')) LIKE $3 ESCAPE '\\')";

/// Substring `LIKE` pattern with the term's own wildcards taken literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Page bounds as Postgres `BIGINT`; values past `i64::MAX` saturate
fn to_bigint(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl PatientRepositoryTrait for PostgresStorage {
    async fn create_patient(&self, record: NewPatientRecord) -> Result<PatientRecord, RepositoryError> {
        debug!("Inserting patient record for {}", record.patient_name);

        let sql = format!(
            "INSERT INTO patient_records (id, patient_name, contact_number, email, age, gender, address,
                person_in_charge, treatment_id, package_id, session_date, total_amount, amount_paid,
                payment_method, notes, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, FALSE, $16, $16)
             RETURNING {}",
            PATIENT_COLUMNS
        );

        let row: PatientRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&record.patient_name)
            .bind(&record.contact_number)
            .bind(&record.email)
            .bind(record.age)
            .bind(&record.gender)
            .bind(&record.address)
            .bind(&record.person_in_charge)
            .bind(record.treatment_id)
            .bind(record.package_id)
            .bind(record.session_date)
            .bind(record.total_amount)
            .bind(record.amount_paid)
            .bind(record.payment_method.as_str())
            .bind(&record.notes)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError> {
        let sql = format!("SELECT {} FROM patient_records WHERE id = $1", PATIENT_COLUMNS);

        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(PatientRecord::try_from).transpose()
    }

    async fn list_patients(
        &self,
        filter: PatientRecordFilter,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        let pattern = filter.search.as_deref().map(like_pattern);

        let count_sql = format!("SELECT COUNT(*) FROM patient_records WHERE {}", PATIENT_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.include_archived)
            .bind(&filter.person_in_charge)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {} FROM patient_records WHERE {}
             ORDER BY session_date DESC, created_at DESC
             LIMIT $4 OFFSET $5",
            PATIENT_COLUMNS, PATIENT_FILTER
        );

        let limit = filter.limit.map(to_bigint).unwrap_or(total);
        let offset = to_bigint(filter.offset.unwrap_or(0));

        let rows: Vec<PatientRow> = sqlx::query_as(&sql)
            .bind(filter.include_archived)
            .bind(&filter.person_in_charge)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok((convert_rows(rows)?, total as usize))
    }

    async fn update_patient(
        &self,
        id: Uuid,
        update: PatientRecordUpdate,
    ) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Updating patient record {}", id);

        let sql = format!(
            "UPDATE patient_records SET
                patient_name = COALESCE($2, patient_name),
                contact_number = COALESCE($3, contact_number),
                email = COALESCE($4, email),
                age = COALESCE($5, age),
                gender = COALESCE($6, gender),
                address = COALESCE($7, address),
                person_in_charge = COALESCE($8, person_in_charge),
                treatment_id = COALESCE($9, treatment_id),
                package_id = COALESCE($10, package_id),
                session_date = COALESCE($11, session_date),
                total_amount = COALESCE($12, total_amount),
                amount_paid = COALESCE($13, amount_paid),
                payment_method = COALESCE($14, payment_method),
                notes = COALESCE($15, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PATIENT_COLUMNS
        );

        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.patient_name)
            .bind(&update.contact_number)
            .bind(&update.email)
            .bind(update.age)
            .bind(&update.gender)
            .bind(&update.address)
            .bind(&update.person_in_charge)
            .bind(update.treatment_id)
            .bind(update.package_id)
            .bind(update.session_date)
            .bind(update.total_amount)
            .bind(update.amount_paid)
            .bind(update.payment_method.map(|m| m.as_str()))
            .bind(&update.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(PatientRecord::try_from).transpose()
    }

    async fn set_patient_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<PatientRecord>, RepositoryError> {
        let sql = format!(
            "UPDATE patient_records SET archived = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            PATIENT_COLUMNS
        );

        let row: Option<PatientRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(PatientRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Maria"), "%maria%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_page_bounds_saturate() {
        assert_eq!(to_bigint(20), 20);
        assert_eq!(to_bigint(usize::MAX), i64::MAX);
    }
}
