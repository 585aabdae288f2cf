use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use prism_domain::auth::logging::log_logout;
use prism_domain::auth::session::Session;
use prism_domain::auth::UserInfo;
use prism_domain::ServiceError;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::routes::AppState;
use crate::entities::accounts::{
    AccountListResponse, AccountResponseBody, CreateAccountRequest, LoginRequest, LoginResponse, SessionResponse,
    UpdateAccountRequest,
};
use crate::entities::common::{ErrorResponse, IncludeArchivedQuery, MessageResponse};

/// Log in with username and password; sets the `prism.sid` session cookie
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing credentials", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let account = state
        .services
        .accounts
        .authenticate(&request.username, &request.password)
        .await?;
    let (_, cookie) = state.auth.start_session(&account).map_err(ServiceError::from)?;

    info!("User {} logged in", account.username);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { success: true, user: account.into() }),
    ))
}

/// End the current session and clear the cookie
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Option<Extension<Session>>,
) -> impl IntoResponse {
    if let Some(Extension(session)) = session {
        state.auth.end_session(&session.id);
        log_logout(&session.username);
    }

    (
        StatusCode::OK,
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        Json(MessageResponse::ok("Logged out")),
    )
}

/// The user behind the current request
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current user", body = SessionResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn current_session(Extension(user): Extension<UserInfo>) -> Json<SessionResponse> {
    Json(SessionResponse { success: true, user })
}

/// Create a staff account (admin only)
#[utoipa::path(
    post,
    path = "/adduser",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse)
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn add_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let account = state.services.accounts.create_account(request.into_input()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponseBody { success: true, user: account.into() }),
    ))
}

/// List staff accounts (admin only)
#[utoipa::path(
    get,
    path = "/getusers",
    params(IncludeArchivedQuery),
    responses(
        (status = 200, description = "Accounts", body = AccountListResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    tag = "accounts"
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeArchivedQuery>,
) -> ApiResult<Json<AccountListResponse>> {
    let accounts = state.services.accounts.list_accounts(query.include_archived).await?;
    Ok(Json(AccountListResponse {
        success: true,
        users: accounts.into_iter().map(Into::into).collect(),
    }))
}

/// Update a staff account (admin only)
#[utoipa::path(
    put,
    path = "/updateuser",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountResponseBody),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Admin role required, or an admin changing their own role or status", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "accounts"
)]
#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> ApiResult<Json<AccountResponseBody>> {
    request.validate()?;

    let actor_id = Uuid::parse_str(&user.user_id)
        .map_err(|_| ApiError::Forbidden("Account changes require a staff session".to_string()))?;
    let (id, patch) = request.into_patch()?;

    let account = state.services.accounts.update_account(actor_id, id, patch).await?;
    Ok(Json(AccountResponseBody { success: true, user: account.into() }))
}
