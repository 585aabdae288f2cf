use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Local;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::AppState;
use crate::entities::appointments::{
    AppointmentListQuery, AppointmentListResponse, AppointmentResponseBody, ConfirmStagedRequest,
    ConfirmedBookingResponse, CreateAppointmentRequest, CreateStagedRequest, StagedListQuery, StagedListResponse,
    StagedResponseBody,
};
use crate::entities::common::{ArchiveRequest, ErrorResponse};

/// Submit a booking request from the public site
#[utoipa::path(
    post,
    path = "/api/appointments/staged",
    request_body = CreateStagedRequest,
    responses(
        (status = 201, description = "Request stored as pending", body = StagedResponseBody),
        (status = 400, description = "Invalid input or unavailable slot", body = ErrorResponse),
        (status = 409, description = "Slot is fully booked", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip_all)]
pub async fn submit_staged(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateStagedRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let staged = state
        .services
        .appointments
        .submit_staged(request.into(), Local::now().naive_local())
        .await?;

    info!("Staged appointment {} submitted", staged.id);
    Ok((
        StatusCode::CREATED,
        Json(StagedResponseBody { success: true, appointment: staged.into() }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/appointments/staged",
    params(StagedListQuery),
    responses(
        (status = 200, description = "Staged appointments", body = StagedListResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn list_staged(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StagedListQuery>,
) -> ApiResult<Json<StagedListResponse>> {
    let staged = state.services.appointments.list_staged(query.status()?).await?;
    Ok(Json(StagedListResponse {
        success: true,
        appointments: staged.into_iter().map(Into::into).collect(),
    }))
}

/// Confirm a pending request.
///
/// Writes the patient record and the appointment, marks the request
/// confirmed and optionally records a sale of `amount_paid`, all or nothing.
#[utoipa::path(
    post,
    path = "/api/appointments/staged/{id}/confirm",
    params(("id" = Uuid, Path, description = "Staged appointment id")),
    request_body = ConfirmStagedRequest,
    responses(
        (status = 200, description = "Confirmed", body = ConfirmedBookingResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Not pending", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip(state, request))]
pub async fn confirm_staged(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ConfirmStagedRequest>,
) -> ApiResult<Json<ConfirmedBookingResponse>> {
    request.validate()?;

    let booking = state.services.appointments.confirm_staged(id, request.into_input()?).await?;
    info!("Staged appointment {} confirmed as patient record {}", id, booking.patient_record.id);
    Ok(Json(booking.into()))
}

#[utoipa::path(
    post,
    path = "/api/appointments/staged/{id}/reject",
    params(("id" = Uuid, Path, description = "Staged appointment id")),
    responses(
        (status = 200, description = "Rejected", body = StagedResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Not pending", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn reject_staged(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<StagedResponseBody>> {
    let staged = state.services.appointments.reject_staged(id).await?;
    Ok(Json(StagedResponseBody { success: true, appointment: staged.into() }))
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    params(AppointmentListQuery),
    responses(
        (status = 200, description = "Appointments", body = AppointmentListResponse),
        (status = 400, description = "Invalid date range", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AppointmentListQuery>,
) -> ApiResult<Json<AppointmentListResponse>> {
    let appointments = state.services.appointments.list_appointments(query.into()).await?;
    Ok(Json(AppointmentListResponse {
        success: true,
        appointments: appointments.into_iter().map(Into::into).collect(),
    }))
}

/// Book an appointment directly from the front desk
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentResponseBody),
        (status = 400, description = "Invalid input or unavailable slot", body = ErrorResponse),
        (status = 409, description = "Slot is fully booked", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip_all)]
pub async fn create_appointment(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let appointment = state
        .services
        .appointments
        .book_appointment(request.into(), Local::now().naive_local())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponseBody { success: true, appointment: appointment.into() }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/archive",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = AppointmentResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "appointments"
)]
#[instrument(skip(state))]
pub async fn archive_appointment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<AppointmentResponseBody>> {
    let appointment = state.services.appointments.set_appointment_archived(id, request.archived).await?;
    Ok(Json(AppointmentResponseBody { success: true, appointment: appointment.into() }))
}
