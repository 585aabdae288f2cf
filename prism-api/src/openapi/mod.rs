use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Configure Swagger UI endpoints
pub fn configure_swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}

// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_check,

        crate::api::handlers::auth::login,
        crate::api::handlers::auth::logout,
        crate::api::handlers::auth::current_session,
        crate::api::handlers::auth::add_user,
        crate::api::handlers::auth::get_users,
        crate::api::handlers::auth::update_user,

        crate::api::handlers::patients::list_patients,
        crate::api::handlers::patients::create_patient,
        crate::api::handlers::patients::get_patient,
        crate::api::handlers::patients::update_patient,
        crate::api::handlers::patients::archive_patient,

        crate::api::handlers::appointments::submit_staged,
        crate::api::handlers::appointments::list_staged,
        crate::api::handlers::appointments::confirm_staged,
        crate::api::handlers::appointments::reject_staged,
        crate::api::handlers::appointments::list_appointments,
        crate::api::handlers::appointments::create_appointment,
        crate::api::handlers::appointments::archive_appointment,

        crate::api::handlers::booking::day_slots,
        crate::api::handlers::booking::month_calendar,

        crate::api::handlers::catalog::list_treatments,
        crate::api::handlers::catalog::create_treatment,
        crate::api::handlers::catalog::update_treatment,
        crate::api::handlers::catalog::archive_treatment,
        crate::api::handlers::catalog::list_packages,
        crate::api::handlers::catalog::create_package,
        crate::api::handlers::catalog::update_package,
        crate::api::handlers::catalog::archive_package,

        crate::api::handlers::finance::list_categories,
        crate::api::handlers::finance::create_category,
        crate::api::handlers::finance::rename_category,
        crate::api::handlers::finance::archive_category,
        crate::api::handlers::finance::list_expenses,
        crate::api::handlers::finance::create_expense,
        crate::api::handlers::finance::update_expense,
        crate::api::handlers::finance::archive_expense,
        crate::api::handlers::finance::list_sales,
        crate::api::handlers::finance::record_sale,
        crate::api::handlers::finance::financial_overview
    ),
    components(
        schemas(
            // Shared
            crate::entities::common::ErrorResponse,
            crate::entities::common::MessageResponse,
            crate::entities::common::ArchiveRequest,
            crate::entities::common::PatientPageResponse,

            // Health
            crate::api::handlers::health::HealthResponse,
            crate::api::handlers::health::ComponentHealthStatus,

            // Accounts
            prism_domain::auth::UserInfo,
            crate::entities::accounts::LoginRequest,
            crate::entities::accounts::LoginResponse,
            crate::entities::accounts::SessionResponse,
            crate::entities::accounts::AccountResponse,
            crate::entities::accounts::AccountResponseBody,
            crate::entities::accounts::AccountListResponse,
            crate::entities::accounts::CreateAccountRequest,
            crate::entities::accounts::UpdateAccountRequest,

            // Patients
            crate::entities::patients::PatientResponse,
            crate::entities::patients::PatientResponseBody,
            crate::entities::patients::CreatePatientRequest,
            crate::entities::patients::UpdatePatientRequest,

            // Appointments
            crate::entities::appointments::CreateStagedRequest,
            crate::entities::appointments::StagedResponse,
            crate::entities::appointments::StagedResponseBody,
            crate::entities::appointments::StagedListResponse,
            crate::entities::appointments::ConfirmStagedRequest,
            crate::entities::appointments::ConfirmedBookingResponse,
            crate::entities::appointments::AppointmentResponse,
            crate::entities::appointments::AppointmentResponseBody,
            crate::entities::appointments::AppointmentListResponse,
            crate::entities::appointments::CreateAppointmentRequest,

            // Booking
            crate::entities::booking::SlotResponse,
            crate::entities::booking::DaySlotsResponse,
            crate::entities::booking::CalendarDayResponse,
            crate::entities::booking::CalendarResponse,

            // Catalog
            crate::entities::catalog::TreatmentResponse,
            crate::entities::catalog::TreatmentResponseBody,
            crate::entities::catalog::TreatmentListResponse,
            crate::entities::catalog::CreateTreatmentRequest,
            crate::entities::catalog::UpdateTreatmentRequest,
            crate::entities::catalog::PackageResponse,
            crate::entities::catalog::PackageResponseBody,
            crate::entities::catalog::PackageListResponse,
            crate::entities::catalog::CreatePackageRequest,
            crate::entities::catalog::UpdatePackageRequest,

            // Finance
            crate::entities::finance::CategoryResponse,
            crate::entities::finance::CategoryResponseBody,
            crate::entities::finance::CategoryListResponse,
            crate::entities::finance::CategoryRequest,
            crate::entities::finance::ExpenseResponse,
            crate::entities::finance::ExpenseResponseBody,
            crate::entities::finance::ExpenseListResponse,
            crate::entities::finance::CreateExpenseRequest,
            crate::entities::finance::UpdateExpenseRequest,
            crate::entities::finance::SaleResponse,
            crate::entities::finance::SaleResponseBody,
            crate::entities::finance::SaleListResponse,
            crate::entities::finance::CreateSaleRequest,
            crate::entities::finance::MonthlyTotalsResponse,
            crate::entities::finance::CategoryTotalResponse,
            crate::entities::finance::OverviewResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "auth", description = "Login, logout and the current session"),
        (name = "accounts", description = "Staff account administration"),
        (name = "patients", description = "Patient records"),
        (name = "appointments", description = "Staged requests, confirmation and appointments"),
        (name = "booking", description = "Slot availability and the booking calendar"),
        (name = "catalog", description = "Treatments and packages"),
        (name = "finance", description = "Expense categories, expenses, sales and the financial overview")
    ),
    info(
        title = "PRISM Clinic API",
        version = "0.1.0",
        description = "Clinic management backend: patients, appointments, staff accounts, services and finances",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        ),
    ),
    servers(
        (url = "/", description = "Local development server")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_generation() {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "PRISM Clinic API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi.tags.as_ref().unwrap();
        assert!(tags.iter().any(|tag| tag.name == "appointments"));
        assert!(tags.iter().any(|tag| tag.name == "finance"));

        for path in [
            "/health",
            "/login",
            "/updateuser",
            "/api/patients/{id}",
            "/api/appointments/staged/{id}/confirm",
            "/api/booking/calendar",
            "/api/financial-overview",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }
    }
}
