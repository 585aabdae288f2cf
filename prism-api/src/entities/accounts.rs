use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use prism_data::models::{Account, Role};
use prism_domain::auth::UserInfo;
use prism_domain::entities::{AccountPatch, NewAccountInput};

use crate::api::error::ApiError;
use crate::entities::common::{parse_field, parse_optional};

/// Login request payload
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Staff account as returned by the API; never includes the password hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    /// `admin` or `staff`
    pub role: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            full_name: account.full_name,
            email: account.email,
            role: account.role.to_string(),
            archived: account.archived,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: AccountResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponseBody {
    pub success: bool,
    pub user: AccountResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountListResponse {
    pub success: bool,
    pub users: Vec<AccountResponse>,
}

/// `POST /adduser`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAccountRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    /// `admin` or `staff` (default)
    pub role: Option<String>,
}

impl CreateAccountRequest {
    pub fn into_input(self) -> Result<NewAccountInput, ApiError> {
        let role = match self.role.as_deref() {
            Some(role) => parse_field::<Role>("role", role)?,
            None => Role::Staff,
        };
        Ok(NewAccountInput {
            username: self.username,
            password: self.password,
            full_name: self.full_name,
            email: self.email,
            role,
        })
    }
}

/// `PUT /updateuser`; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAccountRequest {
    pub id: Uuid,
    #[validate(length(min = 1, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    pub role: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub archived: Option<bool>,
}

impl UpdateAccountRequest {
    pub fn into_patch(self) -> Result<(Uuid, AccountPatch), ApiError> {
        let role = parse_optional::<Role>("role", self.role.as_deref())?;
        Ok((
            self.id,
            AccountPatch {
                full_name: self.full_name,
                email: self.email,
                role,
                password: self.password,
                archived: self.archived,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_to_staff() {
        let request = CreateAccountRequest {
            username: "maria".into(),
            password: "s3cure-pass".into(),
            full_name: "Maria Santos".into(),
            email: None,
            role: None,
        };
        assert!(request.validate().is_ok());
        assert_eq!(request.into_input().unwrap().role, Role::Staff);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let request = UpdateAccountRequest {
            id: Uuid::new_v4(),
            full_name: None,
            email: None,
            role: Some("owner".into()),
            password: None,
            archived: None,
        };
        assert!(matches!(request.into_patch(), Err(ApiError::Validation(_))));
    }
}
