use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, instrument};
use uuid::Uuid;

use prism_data::models::{
    Appointment, AppointmentFilter, ConfirmedBooking, NewAppointment, NewPatientRecord, NewSale,
    NewStagedAppointment, StagedAppointment, StagedConfirmation, StagedStatus,
};
use prism_data::repository::{AppointmentRepositoryTrait, CatalogRepositoryTrait};

use crate::booking::{self, BookingError, BookingRules, DayAvailability, MonthCalendar};
use crate::entities::ConfirmStagedInput;
use crate::error::{ServiceError, ServiceResult};
use crate::services::patients::validate_amounts;
use crate::services::{ensure_references, require_text};

impl From<BookingError> for ServiceError {
    fn from(err: BookingError) -> Self {
        if err.is_conflict() {
            ServiceError::Conflict(err.to_string())
        } else {
            ServiceError::Validation(err.to_string())
        }
    }
}

#[async_trait]
pub trait AppointmentServiceTrait: Send + Sync {
    /// Store a public booking request after checking the slot is free
    async fn submit_staged(&self, request: NewStagedAppointment, now: NaiveDateTime) -> ServiceResult<StagedAppointment>;

    async fn list_staged(&self, status: Option<StagedStatus>) -> ServiceResult<Vec<StagedAppointment>>;

    /// Turn a pending request into a patient record, an appointment and
    /// optionally a sale, all or nothing
    async fn confirm_staged(&self, id: Uuid, input: ConfirmStagedInput) -> ServiceResult<ConfirmedBooking>;

    async fn reject_staged(&self, id: Uuid) -> ServiceResult<StagedAppointment>;

    async fn list_appointments(&self, filter: AppointmentFilter) -> ServiceResult<Vec<Appointment>>;

    /// Staff-booked appointment; the slot rules still apply
    async fn book_appointment(&self, appointment: NewAppointment, now: NaiveDateTime) -> ServiceResult<Appointment>;

    async fn set_appointment_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Appointment>;

    async fn day_slots(&self, date: NaiveDate, now: NaiveDateTime) -> ServiceResult<DayAvailability>;

    async fn month_calendar(&self, year: i32, month: u32, now: NaiveDateTime) -> ServiceResult<MonthCalendar>;
}

pub struct AppointmentService<A: AppointmentRepositoryTrait, C: CatalogRepositoryTrait> {
    appointments: A,
    catalog: C,
    rules: BookingRules,
}

impl<A: AppointmentRepositoryTrait, C: CatalogRepositoryTrait> AppointmentService<A, C> {
    pub fn new(appointments: A, catalog: C, rules: BookingRules) -> Self {
        Self {
            appointments,
            catalog,
            rules,
        }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    async fn check_slot(&self, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> ServiceResult<()> {
        let booked = self.appointments.booked_slots(date, date).await?;
        booking::check_slot(&self.rules, date, time, &booked, now)?;
        Ok(())
    }

    /// Price of the requested package, else of the requested treatment
    async fn catalog_price(&self, staged: &StagedAppointment) -> ServiceResult<Option<i64>> {
        if let Some(package_id) = staged.package_id {
            if let Some(package) = self.catalog.get_package(package_id).await? {
                return Ok(Some(package.price));
            }
        }
        if let Some(treatment_id) = staged.treatment_id {
            if let Some(treatment) = self.catalog.get_treatment(treatment_id).await? {
                return Ok(Some(treatment.price));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl<A, C> AppointmentServiceTrait for AppointmentService<A, C>
where
    A: AppointmentRepositoryTrait,
    C: CatalogRepositoryTrait,
{
    async fn submit_staged(&self, mut request: NewStagedAppointment, now: NaiveDateTime) -> ServiceResult<StagedAppointment> {
        request.full_name = require_text("full_name", &request.full_name)?;
        request.contact_number = require_text("contact_number", &request.contact_number)?;
        ensure_references(&self.catalog, request.treatment_id, request.package_id).await?;
        self.check_slot(request.preferred_date, request.preferred_time, now).await?;

        let staged = self.appointments.create_staged(request).await?;
        info!(
            "Staged appointment {} requested for {} {}",
            staged.id, staged.preferred_date, staged.preferred_time
        );
        Ok(staged)
    }

    async fn list_staged(&self, status: Option<StagedStatus>) -> ServiceResult<Vec<StagedAppointment>> {
        Ok(self.appointments.list_staged(status).await?)
    }

    #[instrument(skip(self, input))]
    async fn confirm_staged(&self, id: Uuid, input: ConfirmStagedInput) -> ServiceResult<ConfirmedBooking> {
        let staged = self
            .appointments
            .get_staged(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Staged appointment {} not found", id)))?;

        if staged.status != StagedStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Staged appointment {} is already {}",
                id, staged.status
            )));
        }

        let person_in_charge = require_text("person_in_charge", &input.person_in_charge)?;
        let total_amount = match input.total_amount {
            Some(total) => total,
            None => self.catalog_price(&staged).await?.ok_or_else(|| {
                ServiceError::Validation(
                    "total_amount is required when no treatment or package is selected".to_string(),
                )
            })?,
        };
        validate_amounts(total_amount, input.amount_paid)?;

        let session_date = input.session_date.unwrap_or(staged.preferred_date);
        let sale = (input.record_sale && input.amount_paid > 0).then(|| NewSale {
            patient_record_id: None,
            appointment_id: None,
            description: format!("Payment from {}", staged.full_name),
            amount: input.amount_paid,
            payment_method: input.payment_method,
            sale_date: session_date,
        });

        let patient = NewPatientRecord {
            patient_name: staged.full_name.clone(),
            contact_number: staged.contact_number.clone(),
            email: staged.email.clone(),
            age: input.age,
            gender: input.gender,
            address: input.address,
            person_in_charge,
            treatment_id: staged.treatment_id,
            package_id: staged.package_id,
            session_date,
            total_amount,
            amount_paid: input.amount_paid,
            payment_method: input.payment_method,
            notes: input.notes.or_else(|| staged.notes.clone()),
        };

        let booking = self
            .appointments
            .confirm_staged(id, StagedConfirmation { patient, sale })
            .await?;

        info!(
            "Confirmed staged appointment {} as patient record {}{}",
            id,
            booking.patient_record.id,
            if booking.sale.is_some() { " with sale" } else { "" }
        );
        Ok(booking)
    }

    async fn reject_staged(&self, id: Uuid) -> ServiceResult<StagedAppointment> {
        let staged = self
            .appointments
            .set_staged_status(id, StagedStatus::Rejected)
            .await?;
        info!("Rejected staged appointment {}", id);
        Ok(staged)
    }

    async fn list_appointments(&self, filter: AppointmentFilter) -> ServiceResult<Vec<Appointment>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ServiceError::Validation("'from' must not be after 'to'".to_string()));
            }
        }
        Ok(self.appointments.list_appointments(filter).await?)
    }

    async fn book_appointment(&self, mut appointment: NewAppointment, now: NaiveDateTime) -> ServiceResult<Appointment> {
        appointment.full_name = require_text("full_name", &appointment.full_name)?;
        ensure_references(&self.catalog, appointment.treatment_id, appointment.package_id).await?;
        self.check_slot(appointment.appointment_date, appointment.appointment_time, now)
            .await?;

        let created = self.appointments.create_appointment(appointment).await?;
        info!("Booked appointment {}", created.id);
        Ok(created)
    }

    async fn set_appointment_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Appointment> {
        self.appointments
            .set_appointment_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Appointment {} not found", id)))
    }

    async fn day_slots(&self, date: NaiveDate, now: NaiveDateTime) -> ServiceResult<DayAvailability> {
        let booked = self.appointments.booked_slots(date, date).await?;
        Ok(booking::day_availability(&self.rules, date, &booked, now))
    }

    async fn month_calendar(&self, year: i32, month: u32, now: NaiveDateTime) -> ServiceResult<MonthCalendar> {
        let (first, last) = booking::month_bounds(year, month)?;
        let booked = self.appointments.booked_slots(first, last).await?;
        Ok(booking::month_calendar(&self.rules, year, month, &booked, now)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_data::models::{NewTreatment, PatientRecordFilter, PaymentMethod, SaleFilter};
    use prism_data::repository::{
        FinanceRepositoryTrait, InMemoryStorage, MockAppointmentRepositoryTrait, PatientRepositoryTrait,
        RepositoryError,
    };

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    // Monday morning
    fn now() -> NaiveDateTime {
        date(4).and_time(time(8))
    }

    fn service(storage: &InMemoryStorage) -> AppointmentService<InMemoryStorage, InMemoryStorage> {
        AppointmentService::new(storage.clone(), storage.clone(), BookingRules::default())
    }

    fn request(day: u32, hour: u32) -> NewStagedAppointment {
        NewStagedAppointment {
            full_name: "Maria Santos".to_string(),
            contact_number: "09171234567".to_string(),
            email: None,
            preferred_date: date(day),
            preferred_time: time(hour),
            treatment_id: None,
            package_id: None,
            notes: Some("first visit".to_string()),
        }
    }

    fn confirm_input(amount_paid: i64, record_sale: bool) -> ConfirmStagedInput {
        ConfirmStagedInput {
            person_in_charge: "Dr. Reyes".to_string(),
            total_amount: Some(200_000),
            amount_paid,
            payment_method: PaymentMethod::Cash,
            record_sale,
            age: Some(30),
            gender: None,
            address: None,
            notes: None,
            session_date: None,
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_taken_slot() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);

        service.submit_staged(request(5, 10), now()).await.unwrap();
        let second = service.submit_staged(request(5, 10), now()).await;
        assert!(matches!(second, Err(ServiceError::Conflict(_))));

        // Sunday
        let closed = service.submit_staged(request(10, 10), now()).await;
        assert!(matches!(closed, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_confirm_writes_patient_appointment_and_sale() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        let staged = service.submit_staged(request(5, 10), now()).await.unwrap();

        let booking = service.confirm_staged(staged.id, confirm_input(50_000, true)).await.unwrap();

        assert_eq!(booking.staged.status, StagedStatus::Confirmed);
        assert_eq!(booking.patient_record.remaining_balance(), 150_000);
        assert_eq!(booking.patient_record.notes.as_deref(), Some("first visit"));
        assert_eq!(booking.appointment.appointment_date, date(5));
        let sale = booking.sale.unwrap();
        assert_eq!(sale.amount, 50_000);
        assert_eq!(sale.patient_record_id, Some(booking.patient_record.id));

        let sales = storage.list_sales(SaleFilter::default()).await.unwrap();
        assert_eq!(sales.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_without_payment_records_no_sale() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        let staged = service.submit_staged(request(5, 10), now()).await.unwrap();

        let booking = service.confirm_staged(staged.id, confirm_input(0, true)).await.unwrap();
        assert!(booking.sale.is_none());
    }

    #[tokio::test]
    async fn test_confirm_twice_conflicts() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        let staged = service.submit_staged(request(5, 10), now()).await.unwrap();

        service.confirm_staged(staged.id, confirm_input(0, false)).await.unwrap();
        let again = service.confirm_staged(staged.id, confirm_input(0, false)).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_invalid_confirmation_writes_nothing() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        let staged = service.submit_staged(request(5, 10), now()).await.unwrap();

        let result = service.confirm_staged(staged.id, confirm_input(500_000, true)).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        let (patients, _) = storage.list_patients(PatientRecordFilter::default()).await.unwrap();
        assert!(patients.is_empty());
        let pending = service.list_staged(Some(StagedStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_total_defaults_to_treatment_price() {
        let storage = InMemoryStorage::new();
        let treatment = storage
            .create_treatment(NewTreatment {
                name: "Laser".into(),
                description: None,
                price: 350_000,
                duration_minutes: 60,
            })
            .await
            .unwrap();
        let service = service(&storage);

        let mut new = request(5, 11);
        new.treatment_id = Some(treatment.id);
        let staged = service.submit_staged(new, now()).await.unwrap();

        let mut input = confirm_input(0, false);
        input.total_amount = None;
        let booking = service.confirm_staged(staged.id, input).await.unwrap();
        assert_eq!(booking.patient_record.total_amount, 350_000);
    }

    #[tokio::test]
    async fn test_reject_then_confirm_conflicts() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        let staged = service.submit_staged(request(5, 10), now()).await.unwrap();

        let rejected = service.reject_staged(staged.id).await.unwrap();
        assert_eq!(rejected.status, StagedStatus::Rejected);

        let result = service.confirm_staged(staged.id, confirm_input(0, false)).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));

        // Rejected requests free their slot
        assert!(service.submit_staged(request(5, 10), now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_day_slots_and_calendar_reflect_bookings() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);
        service.submit_staged(request(5, 10), now()).await.unwrap();

        let day = service.day_slots(date(5), now()).await.unwrap();
        let ten = day.slots.iter().find(|s| s.time == time(10)).unwrap();
        assert!(!ten.available);

        let calendar = service.month_calendar(2024, 3, now()).await.unwrap();
        assert_eq!(calendar.days[4].available_slots, 8);
        assert_eq!(calendar.days[5].available_slots, 9);
    }

    #[tokio::test]
    async fn test_book_and_archive_appointment() {
        let storage = InMemoryStorage::new();
        let service = service(&storage);

        let booked = service
            .book_appointment(
                NewAppointment {
                    patient_record_id: None,
                    staged_appointment_id: None,
                    full_name: "Walk In".into(),
                    appointment_date: date(6),
                    appointment_time: time(14),
                    treatment_id: None,
                    package_id: None,
                    person_in_charge: Some("Dr. Reyes".into()),
                    notes: None,
                },
                now(),
            )
            .await
            .unwrap();

        let listed = service.list_appointments(AppointmentFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);

        service.set_appointment_archived(booked.id, true).await.unwrap();
        let listed = service.list_appointments(AppointmentFilter::default()).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_storage_failure() {
        let mut appointments = MockAppointmentRepositoryTrait::new();
        appointments.expect_get_staged().returning(|id| {
            Ok(Some(StagedAppointment {
                id,
                full_name: "Maria Santos".into(),
                contact_number: "0917".into(),
                email: None,
                preferred_date: date(5),
                preferred_time: time(10),
                treatment_id: None,
                package_id: None,
                notes: None,
                status: StagedStatus::Pending,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            }))
        });
        appointments
            .expect_confirm_staged()
            .returning(|_, _| Err(RepositoryError::Lock("poisoned".into())));

        let service = AppointmentService::new(appointments, InMemoryStorage::new(), BookingRules::default());
        let result = service.confirm_staged(Uuid::new_v4(), confirm_input(0, false)).await;
        assert!(matches!(result, Err(ServiceError::Repository(_))));
    }
}
