use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use prism_data::models::{
    NewPatientRecord, PatientRecord, PatientRecordFilter, PatientRecordUpdate, MAX_AMOUNT,
};
use prism_data::repository::{CatalogRepositoryTrait, PatientRepositoryTrait};

use crate::entities::PatientPage;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{ensure_references, require_text};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[async_trait]
pub trait PatientServiceTrait: Send + Sync {
    async fn create_patient(&self, record: NewPatientRecord) -> ServiceResult<PatientRecord>;

    async fn get_patient(&self, id: Uuid) -> ServiceResult<PatientRecord>;

    /// Limit defaults to 20 and is clamped to 1..=100
    async fn list_patients(&self, filter: PatientRecordFilter) -> ServiceResult<PatientPage>;

    async fn update_patient(&self, id: Uuid, update: PatientRecordUpdate) -> ServiceResult<PatientRecord>;

    async fn set_patient_archived(&self, id: Uuid, archived: bool) -> ServiceResult<PatientRecord>;
}

pub struct PatientService<P: PatientRepositoryTrait, C: CatalogRepositoryTrait> {
    patients: P,
    catalog: C,
}

impl<P: PatientRepositoryTrait, C: CatalogRepositoryTrait> PatientService<P, C> {
    pub fn new(patients: P, catalog: C) -> Self {
        Self { patients, catalog }
    }
}

/// Amounts are non-negative and a patient never pays more than they owe
pub fn validate_amounts(total_amount: i64, amount_paid: i64) -> ServiceResult<()> {
    if total_amount < 0 || amount_paid < 0 {
        return Err(ServiceError::Validation("Amounts cannot be negative".to_string()));
    }
    if total_amount > MAX_AMOUNT {
        return Err(ServiceError::Validation(format!(
            "Total amount cannot exceed {} centavos",
            MAX_AMOUNT
        )));
    }
    if amount_paid > total_amount {
        return Err(ServiceError::Validation(
            "Amount paid cannot exceed the total amount".to_string(),
        ));
    }
    Ok(())
}

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[async_trait]
impl<P, C> PatientServiceTrait for PatientService<P, C>
where
    P: PatientRepositoryTrait,
    C: CatalogRepositoryTrait,
{
    async fn create_patient(&self, mut record: NewPatientRecord) -> ServiceResult<PatientRecord> {
        record.patient_name = require_text("patient_name", &record.patient_name)?;
        record.contact_number = require_text("contact_number", &record.contact_number)?;
        record.person_in_charge = require_text("person_in_charge", &record.person_in_charge)?;
        validate_amounts(record.total_amount, record.amount_paid)?;
        if matches!(record.age, Some(age) if age < 0) {
            return Err(ServiceError::Validation("Age cannot be negative".to_string()));
        }
        ensure_references(&self.catalog, record.treatment_id, record.package_id).await?;

        let created = self.patients.create_patient(record).await?;
        info!("Created patient record {}", created.id);
        Ok(created)
    }

    async fn get_patient(&self, id: Uuid) -> ServiceResult<PatientRecord> {
        self.patients
            .get_patient(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient record {} not found", id)))
    }

    async fn list_patients(&self, mut filter: PatientRecordFilter) -> ServiceResult<PatientPage> {
        let limit = clamp_limit(filter.limit);
        let offset = filter.offset.unwrap_or(0);
        filter.limit = Some(limit);
        filter.offset = Some(offset);
        filter.search = filter.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let (records, total) = self.patients.list_patients(filter).await?;
        Ok(PatientPage {
            records,
            total,
            limit,
            offset,
        })
    }

    async fn update_patient(&self, id: Uuid, update: PatientRecordUpdate) -> ServiceResult<PatientRecord> {
        // Check the merged record so a lone amount_paid cannot overshoot the stored total
        let mut merged = self.get_patient(id).await?;
        update.apply_to(&mut merged);

        for (field, value) in [
            ("patient_name", &merged.patient_name),
            ("contact_number", &merged.contact_number),
            ("person_in_charge", &merged.person_in_charge),
        ] {
            require_text(field, value)?;
        }
        validate_amounts(merged.total_amount, merged.amount_paid)?;
        ensure_references(&self.catalog, update.treatment_id, update.package_id).await?;

        self.patients
            .update_patient(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient record {} not found", id)))
    }

    async fn set_patient_archived(&self, id: Uuid, archived: bool) -> ServiceResult<PatientRecord> {
        let record = self
            .patients
            .set_patient_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Patient record {} not found", id)))?;

        info!("Patient record {} archived={}", id, archived);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use prism_data::models::{NewTreatment, PaymentMethod};
    use prism_data::repository::{InMemoryStorage, MockPatientRepositoryTrait, RepositoryError};

    fn service() -> PatientService<InMemoryStorage, InMemoryStorage> {
        let storage = InMemoryStorage::new();
        PatientService::new(storage.clone(), storage)
    }

    fn record(name: &str) -> NewPatientRecord {
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
            session_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            total_amount: 300_000,
            amount_paid: 100_000,
            payment_method: PaymentMethod::Cash,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = service();
        let created = service.create_patient(record("Maria Santos")).await.unwrap();

        let fetched = service.get_patient(created.id).await.unwrap();
        assert_eq!(fetched.patient_name, "Maria Santos");
        assert_eq!(fetched.remaining_balance(), 200_000);
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let service = service();
        let mut new = record("Maria Santos");
        new.amount_paid = 400_000;

        assert!(matches!(service.create_patient(new).await, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_amounts_capped() {
        assert!(validate_amounts(MAX_AMOUNT, MAX_AMOUNT).is_ok());
        assert!(matches!(validate_amounts(MAX_AMOUNT + 1, 0), Err(ServiceError::Validation(_))));
        assert!(matches!(validate_amounts(i64::MAX, 0), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_checked_against_merged_record() {
        let service = service();
        let created = service.create_patient(record("Maria Santos")).await.unwrap();

        let overpay = PatientRecordUpdate { amount_paid: Some(350_000), ..Default::default() };
        assert!(matches!(
            service.update_patient(created.id, overpay).await,
            Err(ServiceError::Validation(_))
        ));

        let settle = PatientRecordUpdate { amount_paid: Some(300_000), ..Default::default() };
        let updated = service.update_patient(created.id, settle).await.unwrap();
        assert_eq!(updated.remaining_balance(), 0);
        assert_eq!(updated.person_in_charge, "Dr. Reyes");
    }

    #[tokio::test]
    async fn test_unknown_treatment_rejected() {
        let service = service();
        let mut new = record("Maria Santos");
        new.treatment_id = Some(Uuid::new_v4());

        assert!(matches!(service.create_patient(new).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_known_treatment_accepted() {
        let storage = InMemoryStorage::new();
        let treatment = storage
            .create_treatment(NewTreatment {
                name: "Facial".into(),
                description: None,
                price: 150_000,
                duration_minutes: 60,
            })
            .await
            .unwrap();
        let service = PatientService::new(storage.clone(), storage);

        let mut new = record("Maria Santos");
        new.treatment_id = Some(treatment.id);
        assert!(service.create_patient(new).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_pages_and_clamps_limit() {
        let service = service();
        for i in 0..5 {
            service.create_patient(record(&format!("Patient {}", i))).await.unwrap();
        }

        let page = service
            .list_patients(PatientRecordFilter { limit: Some(2), offset: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 5);
        assert!(page.has_next());
        assert!(page.has_previous());

        let page = service
            .list_patients(PatientRecordFilter { limit: Some(1000), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        assert_eq!(clamp_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(0)), 1);
    }

    #[tokio::test]
    async fn test_archived_hidden_by_default() {
        let service = service();
        let created = service.create_patient(record("Maria Santos")).await.unwrap();
        service.set_patient_archived(created.id, true).await.unwrap();

        let page = service.list_patients(PatientRecordFilter::default()).await.unwrap();
        assert_eq!(page.total, 0);

        let page = service
            .list_patients(PatientRecordFilter { include_archived: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_archive_missing_record() {
        let service = service();
        assert!(matches!(
            service.set_patient_archived(Uuid::new_v4(), true).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_repository_error() {
        let mut patients = MockPatientRepositoryTrait::new();
        patients
            .expect_list_patients()
            .returning(|_| Err(RepositoryError::Lock("poisoned".into())));

        let service = PatientService::new(patients, InMemoryStorage::new());
        assert!(matches!(
            service.list_patients(PatientRecordFilter::default()).await,
            Err(ServiceError::Repository(_))
        ));
    }
}
