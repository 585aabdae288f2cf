use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ApiError;

/// Error body shared by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Acknowledgement for actions without a resource body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of every `.../archive` endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub struct ArchiveRequest {
    /// `true` archives, `false` restores
    pub archived: bool,
}

/// `?include_archived=true` on list endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IncludeArchivedQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Paginated response format
#[derive(Debug, Serialize, ToSchema)]
#[aliases(PatientPageResponse = PaginatedResponse<crate::entities::patients::PatientResponse>)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    /// The data items for this page
    pub data: Vec<T>,
    /// Total number of matching items
    pub total: usize,
    /// Number of items returned
    pub count: usize,
    pub offset: usize,
    pub limit: usize,
    /// URL for the next page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// URL for the previous page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// Parse a textual enum value, reporting the field on failure
pub fn parse_field<T>(field: &str, value: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| ApiError::Validation(format!("{}: {}", field, e)))
}

/// Parse an optional textual enum value
pub fn parse_optional<T>(field: &str, value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    value.map(|v| parse_field(field, v)).transpose()
}
