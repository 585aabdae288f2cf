use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    Account, AccountUpdate, Appointment, AppointmentFilter, BookedSlot, Category, CategoryUpdate,
    ConfirmedBooking, Expense, ExpenseFilter, ExpenseUpdate, NewAccount, NewAppointment,
    NewCategory, NewExpense, NewPackage, NewPatientRecord, NewSale, NewStagedAppointment,
    NewTreatment, Package, PackageUpdate, PatientRecord, PatientRecordFilter, PatientRecordUpdate,
    Sale, SaleFilter, StagedAppointment, StagedConfirmation, StagedStatus, Treatment,
    TreatmentUpdate,
};
use super::accounts::AccountRepositoryTrait;
use super::appointments::AppointmentRepositoryTrait;
use super::catalog::CatalogRepositoryTrait;
use super::errors::RepositoryError;
use super::finance::FinanceRepositoryTrait;
use super::patients::PatientRepositoryTrait;

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    patients: HashMap<Uuid, PatientRecord>,
    staged: HashMap<Uuid, StagedAppointment>,
    appointments: HashMap<Uuid, Appointment>,
    treatments: HashMap<Uuid, Treatment>,
    packages: HashMap<Uuid, Package>,
    categories: HashMap<Uuid, Category>,
    expenses: HashMap<Uuid, Expense>,
    sales: HashMap<Uuid, Sale>,
}

/// In-memory storage used when no database is configured, and by tests.
///
/// Enforces the same uniqueness and balance rules as the PostgreSQL schema.
/// All tables sit behind one lock so multi-row writes are atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        Ok(self.tables.lock()?)
    }
}

fn patient_from_new(record: NewPatientRecord) -> Result<PatientRecord, RepositoryError> {
    check_balance(record.total_amount, record.amount_paid)?;
    let now = Utc::now();
    Ok(PatientRecord {
        id: Uuid::new_v4(),
        patient_name: record.patient_name,
        contact_number: record.contact_number,
        email: record.email,
        age: record.age,
        gender: record.gender,
        address: record.address,
        person_in_charge: record.person_in_charge,
        treatment_id: record.treatment_id,
        package_id: record.package_id,
        session_date: record.session_date,
        total_amount: record.total_amount,
        amount_paid: record.amount_paid,
        payment_method: record.payment_method,
        notes: record.notes,
        archived: false,
        created_at: now,
        updated_at: now,
    })
}

fn check_balance(total_amount: i64, amount_paid: i64) -> Result<(), RepositoryError> {
    if amount_paid > total_amount {
        return Err(RepositoryError::Validation(
            "amount_paid cannot exceed total_amount".to_string(),
        ));
    }
    Ok(())
}

fn appointment_from_new(appointment: NewAppointment) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_record_id: appointment.patient_record_id,
        staged_appointment_id: appointment.staged_appointment_id,
        full_name: appointment.full_name,
        appointment_date: appointment.appointment_date,
        appointment_time: appointment.appointment_time,
        treatment_id: appointment.treatment_id,
        package_id: appointment.package_id,
        person_in_charge: appointment.person_in_charge,
        notes: appointment.notes,
        archived: false,
        created_at: Utc::now(),
    }
}

fn sale_from_new(sale: NewSale) -> Sale {
    Sale {
        id: Uuid::new_v4(),
        patient_record_id: sale.patient_record_id,
        appointment_id: sale.appointment_id,
        description: sale.description,
        amount: sale.amount,
        payment_method: sale.payment_method,
        sale_date: sale.sale_date,
        created_at: Utc::now(),
    }
}

fn active_category_name_taken(tables: &Tables, name: &str, except: Option<Uuid>) -> bool {
    tables.categories.values().any(|c| {
        !c.archived && Some(c.id) != except && c.name.eq_ignore_ascii_case(name)
    })
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryStorage {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .accounts
            .values()
            .any(|a| a.username.eq_ignore_ascii_case(&account.username))
        {
            return Err(RepositoryError::Conflict(format!(
                "Username {} is already taken",
                account.username
            )));
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            full_name: account.full_name,
            email: account.email,
            role: account.role,
            password_hash: account.password_hash,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_accounts(&self, include_archived: bool) -> Result<Vec<Account>, RepositoryError> {
        let tables = self.lock()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| include_archived || !a.archived)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> Result<Option<Account>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.accounts.get_mut(&id).map(|account| {
            update.apply_to(account);
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn count_accounts(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.accounts.len())
    }
}

#[async_trait]
impl PatientRepositoryTrait for InMemoryStorage {
    async fn create_patient(&self, record: NewPatientRecord) -> Result<PatientRecord, RepositoryError> {
        let created = patient_from_new(record)?;
        self.lock()?.patients.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<PatientRecord>, RepositoryError> {
        Ok(self.lock()?.patients.get(&id).cloned())
    }

    async fn list_patients(
        &self,
        filter: PatientRecordFilter,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        let tables = self.lock()?;

        let mut records: Vec<PatientRecord> = tables
            .patients
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.session_date
                .cmp(&a.session_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let total = records.len();
        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(total);

        let page = records.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn update_patient(
        &self,
        id: Uuid,
        update: PatientRecordUpdate,
    ) -> Result<Option<PatientRecord>, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(record) = tables.patients.get_mut(&id) else {
            return Ok(None);
        };

        let mut patched = record.clone();
        update.apply_to(&mut patched);
        check_balance(patched.total_amount, patched.amount_paid)?;
        patched.updated_at = Utc::now();

        *record = patched.clone();
        Ok(Some(patched))
    }

    async fn set_patient_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<PatientRecord>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.patients.get_mut(&id).map(|record| {
            record.archived = archived;
            record.updated_at = Utc::now();
            record.clone()
        }))
    }
}

#[async_trait]
impl AppointmentRepositoryTrait for InMemoryStorage {
    async fn create_staged(&self, request: NewStagedAppointment) -> Result<StagedAppointment, RepositoryError> {
        let now = Utc::now();
        let staged = StagedAppointment {
            id: Uuid::new_v4(),
            full_name: request.full_name,
            contact_number: request.contact_number,
            email: request.email,
            preferred_date: request.preferred_date,
            preferred_time: request.preferred_time,
            treatment_id: request.treatment_id,
            package_id: request.package_id,
            notes: request.notes,
            status: StagedStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.staged.insert(staged.id, staged.clone());
        Ok(staged)
    }

    async fn get_staged(&self, id: Uuid) -> Result<Option<StagedAppointment>, RepositoryError> {
        Ok(self.lock()?.staged.get(&id).cloned())
    }

    async fn list_staged(&self, status: Option<StagedStatus>) -> Result<Vec<StagedAppointment>, RepositoryError> {
        let tables = self.lock()?;
        let mut staged: Vec<StagedAppointment> = tables
            .staged
            .values()
            .filter(|s| status.map(|wanted| s.status == wanted).unwrap_or(true))
            .cloned()
            .collect();
        staged.sort_by(|a, b| {
            (a.preferred_date, a.preferred_time, a.created_at)
                .cmp(&(b.preferred_date, b.preferred_time, b.created_at))
        });
        Ok(staged)
    }

    async fn set_staged_status(
        &self,
        id: Uuid,
        status: StagedStatus,
    ) -> Result<StagedAppointment, RepositoryError> {
        let mut tables = self.lock()?;
        let staged = tables
            .staged
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Staged appointment {} not found", id)))?;

        if !staged.status.can_transition_to(status) {
            return Err(RepositoryError::Conflict(format!(
                "Staged appointment {} is {} and cannot become {}",
                id, staged.status, status
            )));
        }

        staged.status = status;
        staged.updated_at = Utc::now();
        Ok(staged.clone())
    }

    async fn confirm_staged(
        &self,
        id: Uuid,
        confirmation: StagedConfirmation,
    ) -> Result<ConfirmedBooking, RepositoryError> {
        let mut tables = self.lock()?;

        let staged = tables
            .staged
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Staged appointment {} not found", id)))?;
        if !staged.status.can_transition_to(StagedStatus::Confirmed) {
            return Err(RepositoryError::Conflict(format!(
                "Staged appointment {} is already {}",
                id, staged.status
            )));
        }

        // Build every row before touching the tables so a failure writes nothing
        let patient_record = patient_from_new(confirmation.patient)?;
        let appointment = appointment_from_new(NewAppointment {
            patient_record_id: Some(patient_record.id),
            staged_appointment_id: Some(staged.id),
            full_name: patient_record.patient_name.clone(),
            appointment_date: staged.preferred_date,
            appointment_time: staged.preferred_time,
            treatment_id: patient_record.treatment_id.or(staged.treatment_id),
            package_id: patient_record.package_id.or(staged.package_id),
            person_in_charge: Some(patient_record.person_in_charge.clone()),
            notes: staged.notes.clone(),
        });
        let sale = confirmation.sale.map(|sale| {
            sale_from_new(NewSale {
                patient_record_id: Some(patient_record.id),
                appointment_id: Some(appointment.id),
                ..sale
            })
        });

        let mut confirmed = staged;
        confirmed.status = StagedStatus::Confirmed;
        confirmed.updated_at = Utc::now();

        tables.patients.insert(patient_record.id, patient_record.clone());
        tables.appointments.insert(appointment.id, appointment.clone());
        if let Some(sale) = &sale {
            tables.sales.insert(sale.id, sale.clone());
        }
        tables.staged.insert(confirmed.id, confirmed.clone());

        Ok(ConfirmedBooking {
            staged: confirmed,
            patient_record,
            appointment,
            sale,
        })
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        let created = appointment_from_new(appointment);
        self.lock()?.appointments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.lock()?.appointments.get(&id).cloned())
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let tables = self.lock()?;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            (a.appointment_date, a.appointment_time).cmp(&(b.appointment_date, b.appointment_time))
        });
        Ok(appointments)
    }

    async fn set_appointment_archived(
        &self,
        id: Uuid,
        archived: bool,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.appointments.get_mut(&id).map(|appointment| {
            appointment.archived = archived;
            appointment.clone()
        }))
    }

    async fn booked_slots(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<BookedSlot>, RepositoryError> {
        let tables = self.lock()?;
        let in_range = |date: NaiveDate| date >= from && date <= to;

        let confirmed = tables
            .appointments
            .values()
            .filter(|a| !a.archived && in_range(a.appointment_date))
            .map(|a| BookedSlot {
                date: a.appointment_date,
                time: a.appointment_time,
            });
        let pending = tables
            .staged
            .values()
            .filter(|s| s.status == StagedStatus::Pending && in_range(s.preferred_date))
            .map(|s| BookedSlot {
                date: s.preferred_date,
                time: s.preferred_time,
            });

        Ok(confirmed.chain(pending).collect())
    }
}

#[async_trait]
impl CatalogRepositoryTrait for InMemoryStorage {
    async fn create_treatment(&self, treatment: NewTreatment) -> Result<Treatment, RepositoryError> {
        let now = Utc::now();
        let created = Treatment {
            id: Uuid::new_v4(),
            name: treatment.name,
            description: treatment.description,
            price: treatment.price,
            duration_minutes: treatment.duration_minutes,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.treatments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_treatment(&self, id: Uuid) -> Result<Option<Treatment>, RepositoryError> {
        Ok(self.lock()?.treatments.get(&id).cloned())
    }

    async fn list_treatments(&self, include_archived: bool) -> Result<Vec<Treatment>, RepositoryError> {
        let tables = self.lock()?;
        let mut treatments: Vec<Treatment> = tables
            .treatments
            .values()
            .filter(|t| include_archived || !t.archived)
            .cloned()
            .collect();
        treatments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(treatments)
    }

    async fn update_treatment(
        &self,
        id: Uuid,
        update: TreatmentUpdate,
    ) -> Result<Option<Treatment>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.treatments.get_mut(&id).map(|treatment| {
            update.apply_to(treatment);
            treatment.updated_at = Utc::now();
            treatment.clone()
        }))
    }

    async fn set_treatment_archived(&self, id: Uuid, archived: bool) -> Result<Option<Treatment>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.treatments.get_mut(&id).map(|treatment| {
            treatment.archived = archived;
            treatment.updated_at = Utc::now();
            treatment.clone()
        }))
    }

    async fn create_package(&self, package: NewPackage) -> Result<Package, RepositoryError> {
        let now = Utc::now();
        let created = Package {
            id: Uuid::new_v4(),
            name: package.name,
            description: package.description,
            price: package.price,
            sessions: package.sessions,
            treatment_ids: package.treatment_ids,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.packages.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_package(&self, id: Uuid) -> Result<Option<Package>, RepositoryError> {
        Ok(self.lock()?.packages.get(&id).cloned())
    }

    async fn list_packages(&self, include_archived: bool) -> Result<Vec<Package>, RepositoryError> {
        let tables = self.lock()?;
        let mut packages: Vec<Package> = tables
            .packages
            .values()
            .filter(|p| include_archived || !p.archived)
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    async fn update_package(&self, id: Uuid, update: PackageUpdate) -> Result<Option<Package>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.packages.get_mut(&id).map(|package| {
            update.apply_to(package);
            package.updated_at = Utc::now();
            package.clone()
        }))
    }

    async fn set_package_archived(&self, id: Uuid, archived: bool) -> Result<Option<Package>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.packages.get_mut(&id).map(|package| {
            package.archived = archived;
            package.updated_at = Utc::now();
            package.clone()
        }))
    }
}

#[async_trait]
impl FinanceRepositoryTrait for InMemoryStorage {
    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let mut tables = self.lock()?;
        if active_category_name_taken(&tables, &category.name, None) {
            return Err(RepositoryError::Conflict(format!(
                "Category {} already exists",
                category.name
            )));
        }

        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            archived: false,
            created_at: Utc::now(),
        };
        tables.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, RepositoryError> {
        Ok(self.lock()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self, include_archived: bool) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.lock()?;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| include_archived || !c.archived)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update_category(&self, id: Uuid, update: CategoryUpdate) -> Result<Option<Category>, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(archived) = tables.categories.get(&id).map(|c| c.archived) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            if !archived && active_category_name_taken(&tables, name, Some(id)) {
                return Err(RepositoryError::Conflict(format!("Category {} already exists", name)));
            }
        }

        Ok(tables.categories.get_mut(&id).map(|category| {
            if let Some(name) = update.name {
                category.name = name;
            }
            category.clone()
        }))
    }

    async fn set_category_archived(&self, id: Uuid, archived: bool) -> Result<Option<Category>, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(name) = tables.categories.get(&id).map(|c| c.name.clone()) else {
            return Ok(None);
        };

        if !archived && active_category_name_taken(&tables, &name, Some(id)) {
            return Err(RepositoryError::Conflict(format!("Category {} already exists", name)));
        }

        Ok(tables.categories.get_mut(&id).map(|category| {
            category.archived = archived;
            category.clone()
        }))
    }

    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.categories.contains_key(&expense.category_id) {
            return Err(RepositoryError::Validation(format!(
                "Category {} does not exist",
                expense.category_id
            )));
        }

        let now = Utc::now();
        let created = Expense {
            id: Uuid::new_v4(),
            category_id: expense.category_id,
            description: expense.description,
            amount: expense.amount,
            expense_date: expense.expense_date,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        tables.expenses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_expense(&self, id: Uuid) -> Result<Option<Expense>, RepositoryError> {
        Ok(self.lock()?.expenses.get(&id).cloned())
    }

    async fn list_expenses(&self, filter: ExpenseFilter) -> Result<Vec<Expense>, RepositoryError> {
        let tables = self.lock()?;
        let mut expenses: Vec<Expense> = tables
            .expenses
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        expenses.sort_by(|a, b| {
            b.expense_date
                .cmp(&a.expense_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(expenses)
    }

    async fn update_expense(&self, id: Uuid, update: ExpenseUpdate) -> Result<Option<Expense>, RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(category_id) = update.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(RepositoryError::Validation(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }

        Ok(tables.expenses.get_mut(&id).map(|expense| {
            update.apply_to(expense);
            expense.updated_at = Utc::now();
            expense.clone()
        }))
    }

    async fn set_expense_archived(&self, id: Uuid, archived: bool) -> Result<Option<Expense>, RepositoryError> {
        let mut tables = self.lock()?;
        Ok(tables.expenses.get_mut(&id).map(|expense| {
            expense.archived = archived;
            expense.updated_at = Utc::now();
            expense.clone()
        }))
    }

    async fn create_sale(&self, sale: NewSale) -> Result<Sale, RepositoryError> {
        let created = sale_from_new(sale);
        self.lock()?.sales.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>, RepositoryError> {
        let tables = self.lock()?;
        let mut sales: Vec<Sale> = tables
            .sales
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sales.sort_by(|a, b| {
            b.sale_date
                .cmp(&a.sale_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(sales)
    }

    async fn outstanding_balance(&self) -> Result<i64, RepositoryError> {
        let tables = self.lock()?;
        tables
            .patients
            .values()
            .filter(|r| !r.archived)
            .map(PatientRecord::remaining_balance)
            .try_fold(0i64, i64::checked_add)
            .ok_or_else(|| RepositoryError::InvalidData("Outstanding balance overflows".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentMethod, Role};
    use chrono::NaiveTime;

    fn new_patient(name: &str, total: i64, paid: i64) -> NewPatientRecord {
        NewPatientRecord {
            patient_name: name.to_string(),
            contact_number: "09171234567".to_string(),
            email: None,
            age: Some(30),
            gender: None,
            address: None,
            person_in_charge: "Dr. Reyes".to_string(),
            treatment_id: None,
            package_id: None,
            session_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            total_amount: total,
            amount_paid: paid,
            payment_method: PaymentMethod::Cash,
            notes: None,
        }
    }

    fn new_staged(date: NaiveDate) -> NewStagedAppointment {
        NewStagedAppointment {
            full_name: "Ana Cruz".to_string(),
            contact_number: "09170000000".to_string(),
            email: Some("ana@example.com".to_string()),
            preferred_date: date,
            preferred_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            treatment_id: None,
            package_id: None,
            notes: Some("first visit".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let storage = InMemoryStorage::new();
        let account = NewAccount {
            username: "admin".to_string(),
            full_name: "Admin".to_string(),
            email: None,
            role: Role::Admin,
            password_hash: "hash".to_string(),
        };

        storage.create_account(account.clone()).await.unwrap();
        let duplicate = NewAccount {
            username: "ADMIN".to_string(),
            ..account
        };
        let result = storage.create_account(duplicate).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(storage.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let storage = InMemoryStorage::new();
        let result = storage.create_patient(new_patient("Ben", 1000, 1500)).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        let record = storage.create_patient(new_patient("Ben", 1000, 500)).await.unwrap();
        let update = PatientRecordUpdate {
            amount_paid: Some(2000),
            ..Default::default()
        };
        let result = storage.update_patient(record.id, update).await;
        assert!(matches!(result, Err(RepositoryError::Validation(_))));

        let stored = storage.get_patient(record.id).await.unwrap().unwrap();
        assert_eq!(stored.amount_paid, 500);
    }

    #[tokio::test]
    async fn test_list_patients_pages_and_counts() {
        let storage = InMemoryStorage::new();
        for i in 0..5 {
            storage
                .create_patient(new_patient(&format!("Patient {}", i), 100, 0))
                .await
                .unwrap();
        }

        let filter = PatientRecordFilter {
            limit: Some(2),
            offset: Some(4),
            ..Default::default()
        };
        let (page, total) = storage.list_patients(filter).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_staged_writes_all_rows() {
        let storage = InMemoryStorage::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let staged = storage.create_staged(new_staged(date)).await.unwrap();

        let confirmation = StagedConfirmation {
            patient: new_patient("Ana Cruz", 2500, 1000),
            sale: Some(NewSale {
                patient_record_id: None,
                appointment_id: None,
                description: "Deposit".to_string(),
                amount: 1000,
                payment_method: PaymentMethod::Card,
                sale_date: date,
            }),
        };
        let booking = storage.confirm_staged(staged.id, confirmation).await.unwrap();

        assert_eq!(booking.staged.status, StagedStatus::Confirmed);
        assert_eq!(booking.appointment.staged_appointment_id, Some(staged.id));
        assert_eq!(booking.appointment.patient_record_id, Some(booking.patient_record.id));
        let sale = booking.sale.unwrap();
        assert_eq!(sale.appointment_id, Some(booking.appointment.id));
        assert_eq!(storage.list_sales(SaleFilter::default()).await.unwrap().len(), 1);

        // The slot is held once, by the appointment
        let slots = storage.booked_slots(date, date).await.unwrap();
        assert_eq!(slots.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_twice_is_conflict_and_writes_nothing() {
        let storage = InMemoryStorage::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let staged = storage.create_staged(new_staged(date)).await.unwrap();
        storage
            .set_staged_status(staged.id, StagedStatus::Rejected)
            .await
            .unwrap();

        let confirmation = StagedConfirmation {
            patient: new_patient("Ana Cruz", 2500, 0),
            sale: None,
        };
        let result = storage.confirm_staged(staged.id, confirmation).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        let (patients, _) = storage.list_patients(PatientRecordFilter::default()).await.unwrap();
        assert!(patients.is_empty());
        assert!(storage
            .list_appointments(AppointmentFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_confirm_unknown_is_not_found() {
        let storage = InMemoryStorage::new();
        let confirmation = StagedConfirmation {
            patient: new_patient("Nobody", 0, 0),
            sale: None,
        };
        let result = storage.confirm_staged(Uuid::new_v4(), confirmation).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_active_category_names_are_unique() {
        let storage = InMemoryStorage::new();
        let rent = storage
            .create_category(NewCategory { name: "Rent".to_string() })
            .await
            .unwrap();

        let duplicate = storage.create_category(NewCategory { name: "rent".to_string() }).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

        storage.set_category_archived(rent.id, true).await.unwrap();
        let replacement = storage.create_category(NewCategory { name: "rent".to_string() }).await;
        assert!(replacement.is_ok());

        // Restoring the original would now clash with the replacement
        let restore = storage.set_category_archived(rent.id, false).await;
        assert!(matches!(restore, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_outstanding_balance_skips_archived() {
        let storage = InMemoryStorage::new();
        storage.create_patient(new_patient("A", 1000, 400)).await.unwrap();
        let archived = storage.create_patient(new_patient("B", 800, 0)).await.unwrap();
        storage.set_patient_archived(archived.id, true).await.unwrap();

        assert_eq!(storage.outstanding_balance().await.unwrap(), 600);
    }

    #[tokio::test]
    async fn test_outstanding_balance_overflow_is_an_error() {
        let storage = InMemoryStorage::new();
        storage.create_patient(new_patient("A", i64::MAX, 0)).await.unwrap();
        storage.create_patient(new_patient("B", i64::MAX, 0)).await.unwrap();

        assert!(matches!(
            storage.outstanding_balance().await,
            Err(RepositoryError::InvalidData(_))
        ));
    }
}
