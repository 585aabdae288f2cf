use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::logging::{log_access_denied, log_auth_event, AuthEvent, AuthEventType};
use crate::auth::UserInfo;

/// Middleware for role-based access control.
///
/// Runs after [`crate::auth::auth_middleware`] and passes the request on only
/// when the caller holds one of `required_roles`; otherwise `403`.
pub async fn require_roles<S, I>(
    _state: State<S>,
    req: Request<Body>,
    next: Next,
    required_roles: I,
) -> Response
where
    I: IntoIterator<Item = String>,
{
    let required_roles: Vec<String> = required_roles.into_iter().collect();
    let request_path = req.uri().path().to_string();

    match req.extensions().get::<UserInfo>() {
        Some(user) => {
            if required_roles.iter().any(|role| user.has_role(role)) {
                debug!("User {} authorized for {}", user.username, request_path);
                next.run(req).await
            } else {
                warn!(
                    "User {} lacks required roles {:?} for {}",
                    user.username, required_roles, request_path
                );
                log_access_denied(&user.username, &request_path, &required_roles);

                (
                    StatusCode::FORBIDDEN,
                    Json(json!({
                        "success": false,
                        "error": "forbidden",
                        "message": "You don't have the required permissions to access this resource"
                    })),
                )
                    .into_response()
            }
        }
        None => {
            // The guard must run first; reaching here is a routing mistake
            warn!("No user info found in request extensions for path: {}", request_path);

            let event = AuthEvent::new(AuthEventType::AccessDenied, None, false)
                .with_details("Authentication context missing in request extensions")
                .with_resource(request_path)
                .with_auth_method("rbac");
            log_auth_event(event);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "internal_error",
                    "message": "Authentication context missing"
                })),
            )
                .into_response()
        }
    }
}

/// Middleware factory that requires a specific role.
///
/// ```ignore
/// let admin_routes = Router::new()
///     .route("/adduser", post(add_user))
///     .layer(middleware::from_fn_with_state(state.clone(), require_role("admin")));
/// ```
pub fn require_role<S: Clone + Send + Sync + 'static>(
    role: &str,
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let role = role.to_string();
    move |state, req, next| {
        let roles = vec![role.clone()];
        Box::pin(async move { require_roles(state, req, next, roles).await })
    }
}

/// Middleware factory that requires any of several roles
pub fn require_any_role<S: Clone + Send + Sync + 'static>(
    roles: &[&str],
) -> impl Fn(State<S>, Request<Body>, Next) -> BoxFuture<'static, Response> + Clone + Send + 'static {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    move |state, req, next| {
        let roles = roles.clone();
        Box::pin(async move { require_roles(state, req, next, roles).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn user(roles: &[&str]) -> UserInfo {
        UserInfo {
            user_id: Uuid::new_v4().to_string(),
            username: "maria".to_string(),
            name: Some("Maria Santos".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            auth_source: "session".to_string(),
        }
    }

    fn app(user_info: Option<UserInfo>) -> Router {
        let router = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state((), require_role::<()>("admin")));

        match user_info {
            Some(info) => router.layer(Extension(info)),
            None => router,
        }
    }

    async fn status_for(user_info: Option<UserInfo>) -> StatusCode {
        app(user_info)
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_require_role_with_matching_role() {
        assert_eq!(status_for(Some(user(&["admin"]))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_role_with_no_matching_role() {
        assert_eq!(status_for(Some(user(&["staff"]))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_require_role_without_user_info() {
        assert_eq!(status_for(None).await, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_require_any_role() {
        let app = Router::new()
            .route("/reports", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                (),
                require_any_role::<()>(&["admin", "staff"]),
            ))
            .layer(Extension(user(&["staff"])));

        let response = app
            .oneshot(Request::builder().uri("/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
