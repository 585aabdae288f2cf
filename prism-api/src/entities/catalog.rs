use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use prism_data::models::{NewPackage, NewTreatment, Package, PackageUpdate, Treatment, TreatmentUpdate};

/// Single treatment offered by the clinic. Prices are in centavos.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TreatmentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_minutes: i32,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Treatment> for TreatmentResponse {
    fn from(treatment: Treatment) -> Self {
        Self {
            id: treatment.id,
            name: treatment.name,
            description: treatment.description,
            price: treatment.price,
            duration_minutes: treatment.duration_minutes,
            archived: treatment.archived,
            created_at: treatment.created_at,
            updated_at: treatment.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TreatmentResponseBody {
    pub success: bool,
    pub treatment: TreatmentResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TreatmentListResponse {
    pub success: bool,
    pub treatments: Vec<TreatmentResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTreatmentRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100000000000, message = "Price must be between 0 and 100000000000 centavos"))]
    pub price: i64,
    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration_minutes: i32,
}

impl From<CreateTreatmentRequest> for NewTreatment {
    fn from(request: CreateTreatmentRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            duration_minutes: request.duration_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateTreatmentRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100000000000, message = "Price must be between 0 and 100000000000 centavos"))]
    pub price: Option<i64>,
    #[validate(range(min = 1, message = "Duration must be at least one minute"))]
    pub duration_minutes: Option<i32>,
}

impl From<UpdateTreatmentRequest> for TreatmentUpdate {
    fn from(request: UpdateTreatmentRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            duration_minutes: request.duration_minutes,
        }
    }
}

/// Bundle of sessions sold at one price
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PackageResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub sessions: i32,
    pub treatment_ids: Vec<Uuid>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Package> for PackageResponse {
    fn from(package: Package) -> Self {
        Self {
            id: package.id,
            name: package.name,
            description: package.description,
            price: package.price,
            sessions: package.sessions,
            treatment_ids: package.treatment_ids,
            archived: package.archived,
            created_at: package.created_at,
            updated_at: package.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PackageResponseBody {
    pub success: bool,
    pub package: PackageResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PackageListResponse {
    pub success: bool,
    pub packages: Vec<PackageResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100000000000, message = "Price must be between 0 and 100000000000 centavos"))]
    pub price: i64,
    #[validate(range(min = 1, message = "A package needs at least one session"))]
    pub sessions: i32,
    #[validate(length(min = 1, message = "A package needs at least one treatment"))]
    pub treatment_ids: Vec<Uuid>,
}

impl From<CreatePackageRequest> for NewPackage {
    fn from(request: CreatePackageRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            sessions: request.sessions,
            treatment_ids: request.treatment_ids,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100000000000, message = "Price must be between 0 and 100000000000 centavos"))]
    pub price: Option<i64>,
    #[validate(range(min = 1, message = "A package needs at least one session"))]
    pub sessions: Option<i32>,
    #[validate(length(min = 1, message = "A package needs at least one treatment"))]
    pub treatment_ids: Option<Vec<Uuid>>,
}

impl From<UpdatePackageRequest> for PackageUpdate {
    fn from(request: UpdatePackageRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: request.price,
            sessions: request.sessions,
            treatment_ids: request.treatment_ids,
        }
    }
}
