use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::AppState;
use crate::entities::common::{ArchiveRequest, ErrorResponse, PaginatedResponse, PatientPageResponse};
use crate::entities::patients::{
    CreatePatientRequest, PatientListQuery, PatientResponse, PatientResponseBody, UpdatePatientRequest,
};

const PATIENTS_PATH: &str = "/api/patients";

/// List patient records, newest session first
#[utoipa::path(
    get,
    path = "/api/patients",
    params(PatientListQuery),
    responses(
        (status = 200, description = "One page of patient records", body = PatientPageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn list_patients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientListQuery>,
) -> ApiResult<Json<PaginatedResponse<PatientResponse>>> {
    let page = state.services.patients.list_patients(query.to_filter()).await?;
    debug!("Returning {} of {} patient records", page.records.len(), page.total);

    let next = page
        .has_next()
        .then(|| format!("{}?{}", PATIENTS_PATH, query.page_query(page.limit, page.offset + page.limit)));
    let previous = page.has_previous().then(|| {
        let offset = page.offset.saturating_sub(page.limit);
        format!("{}?{}", PATIENTS_PATH, query.page_query(page.limit, offset))
    });

    let data: Vec<PatientResponse> = page.records.into_iter().map(Into::into).collect();
    Ok(Json(PaginatedResponse {
        success: true,
        count: data.len(),
        data,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
        next,
        previous,
    }))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient record created", body = PatientResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "patients"
)]
#[instrument(skip_all)]
pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePatientRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let record = state.services.patients.create_patient(request.into_new()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(PatientResponseBody { success: true, patient: record.into() }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient record id")),
    responses(
        (status = 200, description = "Patient record", body = PatientResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn get_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PatientResponseBody>> {
    let record = state.services.patients.get_patient(id).await?;
    Ok(Json(PatientResponseBody { success: true, patient: record.into() }))
}

/// Update a patient record; omitted fields are kept
#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient record id")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient record updated", body = PatientResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "patients"
)]
#[instrument(skip(state, request))]
pub async fn update_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdatePatientRequest>,
) -> ApiResult<Json<PatientResponseBody>> {
    request.validate()?;

    let record = state.services.patients.update_patient(id, request.into_update()?).await?;
    Ok(Json(PatientResponseBody { success: true, patient: record.into() }))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}/archive",
    params(("id" = Uuid, Path, description = "Patient record id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = PatientResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "patients"
)]
#[instrument(skip(state))]
pub async fn archive_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<PatientResponseBody>> {
    let record = state.services.patients.set_patient_archived(id, request.archived).await?;
    Ok(Json(PatientResponseBody { success: true, patient: record.into() }))
}
