use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use tower_http::trace::TraceLayer;
use tracing::debug;

use prism_data::repository::ClinicStorage;
use prism_domain::auth::authorize::require_role;
use prism_domain::auth::session::SessionStore;
use prism_domain::auth::token::SessionSigner;
use prism_domain::auth::{auth_middleware, configure_security, AuthState};
use prism_domain::health::{HealthService, HealthServiceTrait, StorageMode};
use prism_domain::services::Services;

use crate::api::handlers::{appointments, auth, booking, catalog, finance, health, patients};
use crate::config::{AppConfig, MAX_SESSION_TTL_HOURS};
use crate::openapi::configure_swagger_routes;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthState,
    pub health: Arc<dyn HealthServiceTrait>,
    pub environment: String,
}

/// Wire services, sessions and health checks over one storage backend
pub fn build_state<S>(config: &AppConfig, storage: S, mode: StorageMode) -> anyhow::Result<AppState>
where
    S: ClinicStorage + Clone + 'static,
{
    let ttl_hours = config.session_ttl_hours.clamp(1, MAX_SESSION_TTL_HOURS);
    let sessions = SessionStore::new(Duration::hours(ttl_hours));
    let signer = SessionSigner::new(&config.session_secret)?;

    Ok(AppState {
        services: Services::new(storage, config.booking.clone(), sessions.clone()),
        auth: AuthState::new(
            sessions.clone(),
            signer,
            config.client_api_key.clone(),
            config.is_production(),
        ),
        health: Arc::new(HealthService::new(mode, sessions)),
        environment: config.environment.clone(),
    })
}

/// Create the application router
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    debug!("Creating application router");

    // Admin-only mutations; `require_role` runs after the guard below
    let admin_routes = Router::new()
        .route("/adduser", post(auth::add_user))
        .route("/getusers", get(auth::get_users))
        .route("/updateuser", put(auth::update_user))
        .route("/api/treatments", post(catalog::create_treatment))
        .route("/api/treatments/:id", put(catalog::update_treatment))
        .route("/api/treatments/:id/archive", put(catalog::archive_treatment))
        .route("/api/packages", post(catalog::create_package))
        .route("/api/packages/:id", put(catalog::update_package))
        .route("/api/packages/:id/archive", put(catalog::archive_package))
        .route("/api/categories", post(finance::create_category))
        .route("/api/categories/:id", put(finance::rename_category))
        .route("/api/categories/:id/archive", put(finance::archive_category))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_role::<AppState>("admin"),
        ));

    debug!("Admin routes configured");

    let api_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/api/session", get(auth::current_session))
        .route("/api/patients", get(patients::list_patients).post(patients::create_patient))
        .route("/api/patients/:id", get(patients::get_patient).put(patients::update_patient))
        .route("/api/patients/:id/archive", put(patients::archive_patient))
        .route(
            "/api/appointments/staged",
            get(appointments::list_staged).post(appointments::submit_staged),
        )
        .route("/api/appointments/staged/:id/confirm", post(appointments::confirm_staged))
        .route("/api/appointments/staged/:id/reject", post(appointments::reject_staged))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/api/appointments/:id/archive", put(appointments::archive_appointment))
        .route("/api/booking/slots", get(booking::day_slots))
        .route("/api/booking/calendar", get(booking::month_calendar))
        .route("/api/treatments", get(catalog::list_treatments))
        .route("/api/packages", get(catalog::list_packages))
        .route("/api/categories", get(finance::list_categories))
        .route("/api/expenses", get(finance::list_expenses).post(finance::create_expense))
        .route("/api/expenses/:id", put(finance::update_expense))
        .route("/api/expenses/:id/archive", put(finance::archive_expense))
        .route("/api/sales", get(finance::list_sales).post(finance::record_sale))
        .route("/api/financial-overview", get(finance::financial_overview))
        .merge(admin_routes)
        // Authentication must happen before authorization
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), auth_middleware));

    debug!("Protected routes configured");

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login));

    let app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .merge(configure_swagger_routes())
        .layer(TraceLayer::new_for_http());

    let app = configure_security(app, &config.cors_origins);
    debug!("Security configuration applied");

    health::initialize_server_start_time();

    app
}
