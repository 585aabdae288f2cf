use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use prism_data::models::{
    Appointment, AppointmentFilter, ConfirmedBooking, NewAppointment, NewStagedAppointment, PaymentMethod,
    StagedAppointment, StagedStatus,
};
use prism_domain::entities::ConfirmStagedInput;

use crate::api::error::ApiError;
use crate::entities::common::{parse_field, parse_optional};
use crate::entities::finance::SaleResponse;
use crate::entities::patients::PatientResponse;

/// Public booking request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStagedRequest {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 50, message = "Contact number is required"))]
    pub contact_number: String,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    pub preferred_date: NaiveDate,
    /// Slot start, `HH:MM:SS`
    #[schema(value_type = String, example = "10:00:00")]
    pub preferred_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    #[validate(length(max = 1000, message = "Notes are limited to 1000 characters"))]
    pub notes: Option<String>,
}

impl From<CreateStagedRequest> for NewStagedAppointment {
    fn from(request: CreateStagedRequest) -> Self {
        Self {
            full_name: request.full_name,
            contact_number: request.contact_number,
            email: request.email,
            preferred_date: request.preferred_date,
            preferred_time: request.preferred_time,
            treatment_id: request.treatment_id,
            package_id: request.package_id,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StagedResponse {
    pub id: Uuid,
    pub full_name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub preferred_date: NaiveDate,
    #[schema(value_type = String, example = "10:00:00")]
    pub preferred_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub notes: Option<String>,
    /// pending, confirmed or rejected
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StagedAppointment> for StagedResponse {
    fn from(staged: StagedAppointment) -> Self {
        Self {
            id: staged.id,
            full_name: staged.full_name,
            contact_number: staged.contact_number,
            email: staged.email,
            preferred_date: staged.preferred_date,
            preferred_time: staged.preferred_time,
            treatment_id: staged.treatment_id,
            package_id: staged.package_id,
            notes: staged.notes,
            status: staged.status.to_string(),
            created_at: staged.created_at,
            updated_at: staged.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StagedResponseBody {
    pub success: bool,
    pub appointment: StagedResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StagedListResponse {
    pub success: bool,
    pub appointments: Vec<StagedResponse>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StagedListQuery {
    /// pending, confirmed or rejected
    pub status: Option<String>,
}

impl StagedListQuery {
    pub fn status(&self) -> Result<Option<StagedStatus>, ApiError> {
        parse_optional("status", self.status.as_deref())
    }
}

/// Staff input when confirming a staged appointment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConfirmStagedRequest {
    #[validate(length(min = 1, message = "Person in charge is required"))]
    pub person_in_charge: String,
    /// Defaults to the price of the requested treatment or package
    #[validate(range(min = 0, max = 100000000000, message = "Total amount must be between 0 and 100000000000 centavos"))]
    pub total_amount: Option<i64>,
    #[validate(range(min = 0, max = 100000000000, message = "Amount paid must be between 0 and 100000000000 centavos"))]
    #[serde(default)]
    pub amount_paid: i64,
    pub payment_method: String,
    /// Record a sale for `amount_paid` (default true)
    #[serde(default = "default_record_sale")]
    pub record_sale: bool,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the requested date
    pub session_date: Option<NaiveDate>,
}

fn default_record_sale() -> bool {
    true
}

impl ConfirmStagedRequest {
    pub fn into_input(self) -> Result<ConfirmStagedInput, ApiError> {
        Ok(ConfirmStagedInput {
            payment_method: parse_field::<PaymentMethod>("payment_method", &self.payment_method)?,
            person_in_charge: self.person_in_charge,
            total_amount: self.total_amount,
            amount_paid: self.amount_paid,
            record_sale: self.record_sale,
            age: self.age,
            gender: self.gender,
            address: self.address,
            notes: self.notes,
            session_date: self.session_date,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub patient_record_id: Option<Uuid>,
    pub staged_appointment_id: Option<Uuid>,
    pub full_name: String,
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "10:00:00")]
    pub appointment_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub person_in_charge: Option<String>,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_record_id: appointment.patient_record_id,
            staged_appointment_id: appointment.staged_appointment_id,
            full_name: appointment.full_name,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            treatment_id: appointment.treatment_id,
            package_id: appointment.package_id,
            person_in_charge: appointment.person_in_charge,
            notes: appointment.notes,
            archived: appointment.archived,
            created_at: appointment.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentResponseBody {
    pub success: bool,
    pub appointment: AppointmentResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentListResponse {
    pub success: bool,
    pub appointments: Vec<AppointmentResponse>,
}

/// Everything written by a confirmation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmedBookingResponse {
    pub success: bool,
    pub staged: StagedResponse,
    pub patient: PatientResponse,
    pub appointment: AppointmentResponse,
    pub sale: Option<SaleResponse>,
}

impl From<ConfirmedBooking> for ConfirmedBookingResponse {
    fn from(booking: ConfirmedBooking) -> Self {
        Self {
            success: true,
            staged: booking.staged.into(),
            patient: booking.patient_record.into(),
            appointment: booking.appointment.into(),
            sale: booking.sale.map(Into::into),
        }
    }
}

/// Staff-booked appointment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAppointmentRequest {
    pub patient_record_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "14:00:00")]
    pub appointment_time: NaiveTime,
    pub treatment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub person_in_charge: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateAppointmentRequest> for NewAppointment {
    fn from(request: CreateAppointmentRequest) -> Self {
        Self {
            patient_record_id: request.patient_record_id,
            staged_appointment_id: None,
            full_name: request.full_name,
            appointment_date: request.appointment_date,
            appointment_time: request.appointment_time,
            treatment_id: request.treatment_id,
            package_id: request.package_id,
            person_in_charge: request.person_in_charge,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AppointmentListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub include_archived: bool,
}

impl From<AppointmentListQuery> for AppointmentFilter {
    fn from(query: AppointmentListQuery) -> Self {
        Self {
            from: query.from,
            to: query.to,
            include_archived: query.include_archived,
        }
    }
}
