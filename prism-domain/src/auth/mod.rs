//! Authentication for the PRISM API
//!
//! The guard admits a request when any of these hold, checked in order:
//! the method is `OPTIONS` (CORS preflight), the `prism.sid` cookie carries a
//! valid signed session, or the `x-api-key` header equals `CLIENT_API_KEY`.
//! Everything else gets `401`.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use utoipa::ToSchema;

use prism_data::models::{Account, Role};

use crate::auth::logging::{log_auth_event, AuthEvent, AuthEventType};
use crate::auth::session::{Session, SessionStore};
use crate::auth::token::{SecurityError, SessionSigner};

pub mod authorize;
pub mod logging;
pub mod password;
pub mod session;
pub mod token;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "prism.sid";

/// Header carrying the static client key used by the public booking page
pub const API_KEY_HEADER: &str = "x-api-key";

/// Role granted to requests admitted by the client API key
pub const API_CLIENT_ROLE: &str = "api_client";

/// User information attached to authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    /// Account id (empty for API-key clients)
    pub user_id: String,
    pub username: String,
    /// Display name
    pub name: Option<String>,
    /// `admin`, `staff` or `api_client`
    pub roles: Vec<String>,
    /// `session` or `api_key`
    pub auth_source: String,
}

impl UserInfo {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin.as_str())
    }

    /// Identity for requests admitted through the client API key
    pub fn api_client() -> Self {
        Self {
            user_id: String::new(),
            username: "api-client".to_string(),
            name: None,
            roles: vec![API_CLIENT_ROLE.to_string()],
            auth_source: "api_key".to_string(),
        }
    }
}

impl From<&Session> for UserInfo {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.to_string(),
            username: session.username.clone(),
            name: Some(session.full_name.clone()),
            roles: vec![session.role.as_str().to_string()],
            auth_source: "session".to_string(),
        }
    }
}

/// Everything the guard needs; cheap to clone
#[derive(Debug, Clone)]
pub struct AuthState {
    pub sessions: SessionStore,
    pub signer: SessionSigner,
    /// `None` disables the API-key branch
    pub api_key: Option<String>,
    /// Adds `Secure` to the session cookie (production)
    pub secure_cookies: bool,
}

impl AuthState {
    pub fn new(
        sessions: SessionStore,
        signer: SessionSigner,
        api_key: Option<String>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            sessions,
            signer,
            api_key: api_key.filter(|k| !k.is_empty()),
            secure_cookies,
        }
    }

    /// Open a session for an account and return it with its `Set-Cookie` value
    pub fn start_session(&self, account: &Account) -> Result<(Session, String), SecurityError> {
        let session = self.sessions.create(account);
        let token = self.signer.sign(&session)?;
        Ok((session, self.session_cookie(&token)))
    }

    /// Resolve a cookie value to its live session
    pub fn resolve_session(&self, token: &str) -> Result<Session, SecurityError> {
        let claims = self.signer.verify(token)?;
        let session = self
            .sessions
            .get(&claims.sid)
            .ok_or(SecurityError::SessionRevoked)?;

        if session.user_id.to_string() != claims.sub {
            return Err(SecurityError::TokenValidation("subject mismatch".to_string()));
        }
        Ok(session)
    }

    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.revoke(session_id)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.sessions.ttl().num_seconds()
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// A `Set-Cookie` value that deletes the session cookie
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn api_key_matches(&self, presented: &str) -> bool {
        match &self.api_key {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            None => false,
        }
    }
}

/// Read one cookie from the `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": "unauthorized",
            "message": "Authentication required"
        })),
    )
        .into_response()
}

/// The authentication guard
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let start_time = Instant::now();
    let request_path = req.uri().path().to_string();

    if let Some(token) = cookie_value(req.headers(), SESSION_COOKIE) {
        match auth.resolve_session(&token) {
            Ok(session) => {
                debug!("Session valid for user {}", session.username);

                let event = AuthEvent::new(AuthEventType::SessionValidation, Some(&session.username), true)
                    .with_resource(request_path)
                    .with_duration(start_time.elapsed().as_millis() as u64)
                    .with_auth_method("session");
                log_auth_event(event);

                req.extensions_mut().insert(UserInfo::from(&session));
                req.extensions_mut().insert(session);
                return next.run(req).await;
            }
            Err(e) => {
                // A stale cookie may still be accompanied by a valid API key
                debug!("Session cookie rejected: {}", e);
            }
        }
    }

    let presented_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    if let Some(key) = presented_key {
        if auth.api_key_matches(&key) {
            let event = AuthEvent::new(AuthEventType::ApiKeyAccess, None, true)
                .with_resource(request_path)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("api_key");
            log_auth_event(event);

            req.extensions_mut().insert(UserInfo::api_client());
            return next.run(req).await;
        }
        warn!("Invalid API key presented for {}", request_path);
    }

    let event = AuthEvent::new(AuthEventType::SessionValidation, None, false)
        .with_details("No valid session or API key")
        .with_resource(request_path)
        .with_duration(start_time.elapsed().as_millis() as u64);
    log_auth_event(event);

    unauthorized()
}

/// Apply CORS and security headers to the application.
///
/// With no configured origins the request origin is mirrored, which keeps
/// credentialed requests from the client working in development.
pub fn configure_security<S>(app: Router<S>, allowed_origins: &[String]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    use tower_http::cors::{AllowOrigin, CorsLayer};
    use tower_http::set_header::SetResponseHeaderLayer;

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    app.layer(cors).layer(security_headers)
}
