use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// Successful password login
    Login,
    /// Rejected login attempt
    FailedLogin,
    /// User logout
    Logout,
    /// Session cookie checked by the guard
    SessionValidation,
    /// Request admitted by the static client API key
    ApiKeyAccess,
    /// Sessions ended by an account change
    SessionRevocation,
    /// Access denied to resource
    AccessDenied,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::Logout => write!(f, "LOGOUT"),
            AuthEventType::SessionValidation => write!(f, "SESSION_VALIDATION"),
            AuthEventType::ApiKeyAccess => write!(f, "API_KEY_ACCESS"),
            AuthEventType::SessionRevocation => write!(f, "SESSION_REVOCATION"),
            AuthEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// Username or account id, when known
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// The resource being accessed
    pub resource: Option<String>,
    /// Duration of the check in milliseconds
    pub duration_ms: Option<u64>,
    /// session, api_key, password, rbac
    pub auth_method: Option<String>,
}

impl AuthEvent {
    /// Create a new authentication event
    pub fn new(event_type: AuthEventType, user_id: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            user_id: user_id.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Emit an authentication event on the `auth_events` target
pub fn log_auth_event(event: AuthEvent) {
    let user = event.user_id.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("-");
    let method = event.auth_method.as_deref().unwrap_or("-");

    if event.success {
        info!(
            target: "auth_events",
            event_type = %event.event_type,
            user = user,
            resource = resource,
            method = method,
            duration_ms = ?event.duration_ms,
            "{}",
            details
        );
    } else {
        warn!(
            target: "auth_events",
            event_type = %event.event_type,
            user = user,
            resource = resource,
            method = method,
            duration_ms = ?event.duration_ms,
            "{}",
            details
        );
    }
}

pub fn log_successful_login(username: &str) {
    let event = AuthEvent::new(AuthEventType::Login, Some(username), true)
        .with_details("Login successful")
        .with_auth_method("password");
    log_auth_event(event);
}

pub fn log_failed_login(username: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(username), false)
        .with_details(reason)
        .with_auth_method("password");
    log_auth_event(event);
}

pub fn log_logout(username: &str) {
    let event = AuthEvent::new(AuthEventType::Logout, Some(username), true)
        .with_auth_method("session");
    log_auth_event(event);
}

pub fn log_session_revocation(user_id: &str, count: usize, reason: &str) {
    let event = AuthEvent::new(AuthEventType::SessionRevocation, Some(user_id), true)
        .with_details(format!("{} session(s) revoked: {}", count, reason));
    log_auth_event(event);
}

pub fn log_access_denied(user_id: &str, resource: &str, required_roles: &[String]) {
    let event = AuthEvent::new(AuthEventType::AccessDenied, Some(user_id), false)
        .with_resource(resource)
        .with_details(format!("Required roles: {}", required_roles.join(", ")))
        .with_auth_method("rbac");
    log_auth_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_auth_event() {
        let event = AuthEvent::new(AuthEventType::Login, Some("maria"), true)
            .with_details("Login from dashboard")
            .with_resource("/login")
            .with_duration(150)
            .with_auth_method("password");

        assert_eq!(event.event_type, AuthEventType::Login);
        assert_eq!(event.user_id.as_deref(), Some("maria"));
        assert!(event.success);
        assert_eq!(event.details.as_deref(), Some("Login from dashboard"));
        assert_eq!(event.resource.as_deref(), Some("/login"));
        assert_eq!(event.duration_ms, Some(150));
        assert_eq!(event.auth_method.as_deref(), Some("password"));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(AuthEventType::Login.to_string(), "LOGIN");
        assert_eq!(AuthEventType::ApiKeyAccess.to_string(), "API_KEY_ACCESS");
        assert_eq!(AuthEventType::FailedLogin.to_string(), "FAILED_LOGIN");
    }
}
