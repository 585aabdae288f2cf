use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentFilter, BookedSlot, ConfirmedBooking, NewAppointment,
    NewStagedAppointment, Sale, StagedAppointment, StagedConfirmation, StagedStatus,
};
use super::errors::{map_sqlx_error, RepositoryError};
use super::storage::{
    convert_rows, AppointmentRow, PatientRow, PostgresStorage, SaleRow, StagedRow,
    APPOINTMENT_COLUMNS, PATIENT_COLUMNS, SALE_COLUMNS, STAGED_COLUMNS,
};

/// Repository trait for staged requests and confirmed appointments
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AppointmentRepositoryTrait: Send + Sync {
    /// Store a new request in `pending` status
    async fn create_staged(&self, request: NewStagedAppointment) -> Result<StagedAppointment, RepositoryError>;

    async fn get_staged(&self, id: Uuid) -> Result<Option<StagedAppointment>, RepositoryError>;

    /// Requests ordered by preferred slot, optionally restricted to one status
    async fn list_staged(&self, status: Option<StagedStatus>) -> Result<Vec<StagedAppointment>, RepositoryError>;

    /// Move a request to `status`.
    ///
    /// Fails with `NotFound` for an unknown id and `Conflict` when the
    /// current status does not allow the transition.
    async fn set_staged_status(
        &self,
        id: Uuid,
        status: StagedStatus,
    ) -> Result<StagedAppointment, RepositoryError>;

    /// Confirm a pending request in a single unit of work: create the
    /// patient record, the appointment, the optional sale, and flip the
    /// request to `confirmed`. Nothing is written if any step fails.
    async fn confirm_staged(
        &self,
        id: Uuid,
        confirmation: StagedConfirmation,
    ) -> Result<ConfirmedBooking, RepositoryError>;

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError>;

    /// Appointments ordered by date and time
    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError>;

    async fn set_appointment_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<Appointment>, RepositoryError>;

    /// Occupied slots between two dates (inclusive): live appointments and
    /// requests still pending review.
    async fn booked_slots(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BookedSlot>, RepositoryError>;
}

#[async_trait]
impl AppointmentRepositoryTrait for PostgresStorage {
    async fn create_staged(&self, request: NewStagedAppointment) -> Result<StagedAppointment, RepositoryError> {
        debug!("Inserting staged appointment for {}", request.full_name);

        let sql = format!(
            "INSERT INTO staged_appointments (id, full_name, contact_number, email, preferred_date,
                preferred_time, treatment_id, package_id, notes, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING {}",
            STAGED_COLUMNS
        );

        let row: StagedRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&request.full_name)
            .bind(&request.contact_number)
            .bind(&request.email)
            .bind(request.preferred_date)
            .bind(request.preferred_time)
            .bind(request.treatment_id)
            .bind(request.package_id)
            .bind(&request.notes)
            .bind(StagedStatus::Pending.as_str())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn get_staged(&self, id: Uuid) -> Result<Option<StagedAppointment>, RepositoryError> {
        let sql = format!("SELECT {} FROM staged_appointments WHERE id = $1", STAGED_COLUMNS);

        let row: Option<StagedRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(StagedAppointment::try_from).transpose()
    }

    async fn list_staged(&self, status: Option<StagedStatus>) -> Result<Vec<StagedAppointment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM staged_appointments
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY preferred_date, preferred_time, created_at",
            STAGED_COLUMNS
        );

        let rows: Vec<StagedRow> = sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        convert_rows(rows)
    }

    async fn set_staged_status(
        &self,
        id: Uuid,
        status: StagedStatus,
    ) -> Result<StagedAppointment, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let current = lock_staged(&mut tx, id).await?;
        if !current.status.can_transition_to(status) {
            return Err(RepositoryError::Conflict(format!(
                "Staged appointment {} is {} and cannot become {}",
                id, current.status, status
            )));
        }

        let updated = write_staged_status(&mut tx, id, status).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(updated)
    }

    async fn confirm_staged(
        &self,
        id: Uuid,
        confirmation: StagedConfirmation,
    ) -> Result<ConfirmedBooking, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let staged = lock_staged(&mut tx, id).await?;
        if !staged.status.can_transition_to(StagedStatus::Confirmed) {
            return Err(RepositoryError::Conflict(format!(
                "Staged appointment {} is already {}",
                id, staged.status
            )));
        }

        let now = Utc::now();
        let patient = confirmation.patient;

        let patient_sql = format!(
            "INSERT INTO patient_records (id, patient_name, contact_number, email, age, gender, address,
                person_in_charge, treatment_id, package_id, session_date, total_amount, amount_paid,
                payment_method, notes, archived, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, FALSE, $16, $16)
             RETURNING {}",
            PATIENT_COLUMNS
        );

        let patient_row: PatientRow = sqlx::query_as(&patient_sql)
            .bind(Uuid::new_v4())
            .bind(&patient.patient_name)
            .bind(&patient.contact_number)
            .bind(&patient.email)
            .bind(patient.age)
            .bind(&patient.gender)
            .bind(&patient.address)
            .bind(&patient.person_in_charge)
            .bind(patient.treatment_id)
            .bind(patient.package_id)
            .bind(patient.session_date)
            .bind(patient.total_amount)
            .bind(patient.amount_paid)
            .bind(patient.payment_method.as_str())
            .bind(&patient.notes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let patient_record = crate::models::PatientRecord::try_from(patient_row)?;

        let appointment_sql = format!(
            "INSERT INTO appointments (id, patient_record_id, staged_appointment_id, full_name,
                appointment_date, appointment_time, treatment_id, package_id, person_in_charge,
                notes, archived, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11)
             RETURNING {}",
            APPOINTMENT_COLUMNS
        );

        let appointment_row: AppointmentRow = sqlx::query_as(&appointment_sql)
            .bind(Uuid::new_v4())
            .bind(patient_record.id)
            .bind(staged.id)
            .bind(&patient_record.patient_name)
            .bind(staged.preferred_date)
            .bind(staged.preferred_time)
            .bind(patient_record.treatment_id.or(staged.treatment_id))
            .bind(patient_record.package_id.or(staged.package_id))
            .bind(&patient_record.person_in_charge)
            .bind(&staged.notes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let appointment = Appointment::from(appointment_row);

        let sale = match confirmation.sale {
            Some(sale) => {
                let sale_sql = format!(
                    "INSERT INTO sales (id, patient_record_id, appointment_id, description, amount,
                        payment_method, sale_date, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING {}",
                    SALE_COLUMNS
                );

                let sale_row: SaleRow = sqlx::query_as(&sale_sql)
                    .bind(Uuid::new_v4())
                    .bind(patient_record.id)
                    .bind(appointment.id)
                    .bind(&sale.description)
                    .bind(sale.amount)
                    .bind(sale.payment_method.as_str())
                    .bind(sale.sale_date)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                Some(Sale::try_from(sale_row)?)
            }
            None => None,
        };

        let staged = write_staged_status(&mut tx, id, StagedStatus::Confirmed).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        info!("Confirmed staged appointment {} as appointment {}", id, appointment.id);

        Ok(ConfirmedBooking {
            staged,
            patient_record,
            appointment,
            sale,
        })
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        let sql = format!(
            "INSERT INTO appointments (id, patient_record_id, staged_appointment_id, full_name,
                appointment_date, appointment_time, treatment_id, package_id, person_in_charge,
                notes, archived, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11)
             RETURNING {}",
            APPOINTMENT_COLUMNS
        );

        let row: AppointmentRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(appointment.patient_record_id)
            .bind(appointment.staged_appointment_id)
            .bind(&appointment.full_name)
            .bind(appointment.appointment_date)
            .bind(appointment.appointment_time)
            .bind(appointment.treatment_id)
            .bind(appointment.package_id)
            .bind(&appointment.person_in_charge)
            .bind(&appointment.notes)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        let sql = format!("SELECT {} FROM appointments WHERE id = $1", APPOINTMENT_COLUMNS);

        let row: Option<AppointmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Appointment::from))
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM appointments
             WHERE ($1 OR NOT archived)
               AND ($2::DATE IS NULL OR appointment_date >= $2)
               AND ($3::DATE IS NULL OR appointment_date <= $3)
             ORDER BY appointment_date, appointment_time",
            APPOINTMENT_COLUMNS
        );

        let rows: Vec<AppointmentRow> = sqlx::query_as(&sql)
            .bind(filter.include_archived)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn set_appointment_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let sql = format!(
            "UPDATE appointments SET archived = $2 WHERE id = $1 RETURNING {}",
            APPOINTMENT_COLUMNS
        );

        let row: Option<AppointmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(archived)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Appointment::from))
    }

    async fn booked_slots(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BookedSlot>, RepositoryError> {
        let rows: Vec<(NaiveDate, NaiveTime)> = sqlx::query_as(
            "SELECT appointment_date, appointment_time FROM appointments
             WHERE NOT archived AND appointment_date BETWEEN $1 AND $2
             UNION ALL
             SELECT preferred_date, preferred_time FROM staged_appointments
             WHERE status = 'pending' AND preferred_date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(date, time)| BookedSlot { date, time })
            .collect())
    }
}

/// Read a staged row and hold its lock until the transaction ends
async fn lock_staged(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
) -> Result<StagedAppointment, RepositoryError> {
    let sql = format!(
        "SELECT {} FROM staged_appointments WHERE id = $1 FOR UPDATE",
        STAGED_COLUMNS
    );

    let row: Option<StagedRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    row.map(StagedAppointment::try_from)
        .transpose()?
        .ok_or_else(|| RepositoryError::NotFound(format!("Staged appointment {} not found", id)))
}

async fn write_staged_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    status: StagedStatus,
) -> Result<StagedAppointment, RepositoryError> {
    let sql = format!(
        "UPDATE staged_appointments SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        STAGED_COLUMNS
    );

    let row: StagedRow = sqlx::query_as(&sql)
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    row.try_into()
}
