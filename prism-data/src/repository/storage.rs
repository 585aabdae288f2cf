use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{
    Account, Appointment, Category, Expense, Package, PatientRecord, Sale, StagedAppointment,
    Treatment,
};
use super::errors::RepositoryError;

/// PostgreSQL-backed storage. Cheap to clone; the pool is reference counted.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pub(crate) pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, username, full_name, email, role, password_hash, archived, created_at, updated_at";

pub(crate) const PATIENT_COLUMNS: &str = "id, patient_name, contact_number, email, age, gender, address, \
     person_in_charge, treatment_id, package_id, session_date, total_amount, amount_paid, \
     payment_method, notes, archived, created_at, updated_at";

pub(crate) const STAGED_COLUMNS: &str = "id, full_name, contact_number, email, preferred_date, preferred_time, \
     treatment_id, package_id, notes, status, created_at, updated_at";

pub(crate) const APPOINTMENT_COLUMNS: &str = "id, patient_record_id, staged_appointment_id, full_name, \
     appointment_date, appointment_time, treatment_id, package_id, person_in_charge, notes, archived, created_at";

pub(crate) const TREATMENT_COLUMNS: &str =
    "id, name, description, price, duration_minutes, archived, created_at, updated_at";

pub(crate) const PACKAGE_COLUMNS: &str =
    "id, name, description, price, sessions, treatment_ids, archived, created_at, updated_at";

pub(crate) const CATEGORY_COLUMNS: &str = "id, name, archived, created_at";

pub(crate) const EXPENSE_COLUMNS: &str =
    "id, category_id, description, amount, expense_date, archived, created_at, updated_at";

pub(crate) const SALE_COLUMNS: &str =
    "id, patient_record_id, appointment_id, description, amount, payment_method, sale_date, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct AccountRow {
    id: Uuid,
    username: String,
    full_name: String,
    email: Option<String>,
    role: String,
    password_hash: String,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            role: row.role.parse().map_err(RepositoryError::InvalidData)?,
            password_hash: row.password_hash,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PatientRow {
    id: Uuid,
    patient_name: String,
    contact_number: String,
    email: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    address: Option<String>,
    person_in_charge: String,
    treatment_id: Option<Uuid>,
    package_id: Option<Uuid>,
    session_date: NaiveDate,
    total_amount: i64,
    amount_paid: i64,
    payment_method: String,
    notes: Option<String>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for PatientRecord {
    type Error = RepositoryError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        Ok(PatientRecord {
            id: row.id,
            patient_name: row.patient_name,
            contact_number: row.contact_number,
            email: row.email,
            age: row.age,
            gender: row.gender,
            address: row.address,
            person_in_charge: row.person_in_charge,
            treatment_id: row.treatment_id,
            package_id: row.package_id,
            session_date: row.session_date,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            payment_method: row.payment_method.parse().map_err(RepositoryError::InvalidData)?,
            notes: row.notes,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StagedRow {
    id: Uuid,
    full_name: String,
    contact_number: String,
    email: Option<String>,
    preferred_date: NaiveDate,
    preferred_time: NaiveTime,
    treatment_id: Option<Uuid>,
    package_id: Option<Uuid>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StagedRow> for StagedAppointment {
    type Error = RepositoryError;

    fn try_from(row: StagedRow) -> Result<Self, Self::Error> {
        Ok(StagedAppointment {
            id: row.id,
            full_name: row.full_name,
            contact_number: row.contact_number,
            email: row.email,
            preferred_date: row.preferred_date,
            preferred_time: row.preferred_time,
            treatment_id: row.treatment_id,
            package_id: row.package_id,
            notes: row.notes,
            status: row.status.parse().map_err(RepositoryError::InvalidData)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AppointmentRow {
    id: Uuid,
    patient_record_id: Option<Uuid>,
    staged_appointment_id: Option<Uuid>,
    full_name: String,
    appointment_date: NaiveDate,
    appointment_time: NaiveTime,
    treatment_id: Option<Uuid>,
    package_id: Option<Uuid>,
    person_in_charge: Option<String>,
    notes: Option<String>,
    archived: bool,
    created_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            patient_record_id: row.patient_record_id,
            staged_appointment_id: row.staged_appointment_id,
            full_name: row.full_name,
            appointment_date: row.appointment_date,
            appointment_time: row.appointment_time,
            treatment_id: row.treatment_id,
            package_id: row.package_id,
            person_in_charge: row.person_in_charge,
            notes: row.notes,
            archived: row.archived,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TreatmentRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    duration_minutes: i32,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TreatmentRow> for Treatment {
    fn from(row: TreatmentRow) -> Self {
        Treatment {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            duration_minutes: row.duration_minutes,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PackageRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    sessions: i32,
    treatment_ids: Vec<Uuid>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            sessions: row.sessions,
            treatment_ids: row.treatment_ids,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CategoryRow {
    id: Uuid,
    name: String,
    archived: bool,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            archived: row.archived,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ExpenseRow {
    id: Uuid,
    category_id: Uuid,
    description: String,
    amount: i64,
    expense_date: NaiveDate,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            category_id: row.category_id,
            description: row.description,
            amount: row.amount,
            expense_date: row.expense_date,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SaleRow {
    id: Uuid,
    patient_record_id: Option<Uuid>,
    appointment_id: Option<Uuid>,
    description: String,
    amount: i64,
    payment_method: String,
    sale_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = RepositoryError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Sale {
            id: row.id,
            patient_record_id: row.patient_record_id,
            appointment_id: row.appointment_id,
            description: row.description,
            amount: row.amount,
            payment_method: row.payment_method.parse().map_err(RepositoryError::InvalidData)?,
            sale_date: row.sale_date,
            created_at: row.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first unmappable one
pub(crate) fn convert_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}
