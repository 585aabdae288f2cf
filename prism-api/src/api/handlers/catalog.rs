use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::AppState;
use crate::entities::catalog::{
    CreatePackageRequest, CreateTreatmentRequest, PackageListResponse, PackageResponseBody, TreatmentListResponse,
    TreatmentResponseBody, UpdatePackageRequest, UpdateTreatmentRequest,
};
use crate::entities::common::{ArchiveRequest, ErrorResponse, IncludeArchivedQuery};

#[utoipa::path(
    get,
    path = "/api/treatments",
    params(IncludeArchivedQuery),
    responses((status = 200, description = "Treatments", body = TreatmentListResponse)),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn list_treatments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeArchivedQuery>,
) -> ApiResult<Json<TreatmentListResponse>> {
    let treatments = state.services.catalog.list_treatments(query.include_archived).await?;
    Ok(Json(TreatmentListResponse {
        success: true,
        treatments: treatments.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/treatments",
    request_body = CreateTreatmentRequest,
    responses(
        (status = 201, description = "Treatment created", body = TreatmentResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip_all)]
pub async fn create_treatment(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateTreatmentRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let treatment = state.services.catalog.create_treatment(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(TreatmentResponseBody { success: true, treatment: treatment.into() }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/treatments/{id}",
    params(("id" = Uuid, Path, description = "Treatment id")),
    request_body = UpdateTreatmentRequest,
    responses(
        (status = 200, description = "Treatment updated", body = TreatmentResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip(state, request))]
pub async fn update_treatment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateTreatmentRequest>,
) -> ApiResult<Json<TreatmentResponseBody>> {
    request.validate()?;

    let treatment = state.services.catalog.update_treatment(id, request.into()).await?;
    Ok(Json(TreatmentResponseBody { success: true, treatment: treatment.into() }))
}

#[utoipa::path(
    put,
    path = "/api/treatments/{id}/archive",
    params(("id" = Uuid, Path, description = "Treatment id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = TreatmentResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn archive_treatment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<TreatmentResponseBody>> {
    let treatment = state.services.catalog.set_treatment_archived(id, request.archived).await?;
    Ok(Json(TreatmentResponseBody { success: true, treatment: treatment.into() }))
}

#[utoipa::path(
    get,
    path = "/api/packages",
    params(IncludeArchivedQuery),
    responses((status = 200, description = "Packages", body = PackageListResponse)),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn list_packages(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeArchivedQuery>,
) -> ApiResult<Json<PackageListResponse>> {
    let packages = state.services.catalog.list_packages(query.include_archived).await?;
    Ok(Json(PackageListResponse {
        success: true,
        packages: packages.into_iter().map(Into::into).collect(),
    }))
}

/// Create a package; every listed treatment must exist
#[utoipa::path(
    post,
    path = "/api/packages",
    request_body = CreatePackageRequest,
    responses(
        (status = 201, description = "Package created", body = PackageResponseBody),
        (status = 400, description = "Invalid input or unknown treatment", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip_all)]
pub async fn create_package(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreatePackageRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let package = state.services.catalog.create_package(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(PackageResponseBody { success: true, package: package.into() }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/packages/{id}",
    params(("id" = Uuid, Path, description = "Package id")),
    request_body = UpdatePackageRequest,
    responses(
        (status = 200, description = "Package updated", body = PackageResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip(state, request))]
pub async fn update_package(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdatePackageRequest>,
) -> ApiResult<Json<PackageResponseBody>> {
    request.validate()?;

    let package = state.services.catalog.update_package(id, request.into()).await?;
    Ok(Json(PackageResponseBody { success: true, package: package.into() }))
}

#[utoipa::path(
    put,
    path = "/api/packages/{id}/archive",
    params(("id" = Uuid, Path, description = "Package id")),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Archive flag set", body = PackageResponseBody),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "catalog"
)]
#[instrument(skip(state))]
pub async fn archive_package(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ArchiveRequest>,
) -> ApiResult<Json<PackageResponseBody>> {
    let package = state.services.catalog.set_package_archived(id, request.archived).await?;
    Ok(Json(PackageResponseBody { success: true, package: package.into() }))
}
