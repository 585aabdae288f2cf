// Domain services
// Business rules on top of the repositories. Each service is generic over the
// repository traits it needs and is handed out as a trait object.

pub mod accounts;
pub mod appointments;
pub mod catalog;
pub mod finance;
pub mod patients;

use std::sync::Arc;

use uuid::Uuid;

use prism_data::repository::{CatalogRepositoryTrait, ClinicStorage};

use crate::auth::session::SessionStore;
use crate::booking::BookingRules;
use crate::error::{ServiceError, ServiceResult};

pub use accounts::{AccountService, AccountServiceTrait};
pub use appointments::{AppointmentService, AppointmentServiceTrait};
pub use catalog::{CatalogService, CatalogServiceTrait};
pub use finance::{FinanceService, FinanceServiceTrait};
pub use patients::{PatientService, PatientServiceTrait};

/// Every service, sharing one storage
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<dyn AccountServiceTrait>,
    pub patients: Arc<dyn PatientServiceTrait>,
    pub appointments: Arc<dyn AppointmentServiceTrait>,
    pub catalog: Arc<dyn CatalogServiceTrait>,
    pub finance: Arc<dyn FinanceServiceTrait>,
}

impl Services {
    pub fn new<S>(storage: S, rules: BookingRules, sessions: SessionStore) -> Self
    where
        S: ClinicStorage + Clone + 'static,
    {
        Self {
            accounts: Arc::new(AccountService::new(storage.clone(), sessions)),
            patients: Arc::new(PatientService::new(storage.clone(), storage.clone())),
            appointments: Arc::new(AppointmentService::new(storage.clone(), storage.clone(), rules)),
            catalog: Arc::new(CatalogService::new(storage.clone())),
            finance: Arc::new(FinanceService::new(storage)),
        }
    }
}

/// Trimmed, non-empty text
pub(crate) fn require_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Referenced treatment and package must exist
pub(crate) async fn ensure_references<C: CatalogRepositoryTrait>(
    catalog: &C,
    treatment_id: Option<Uuid>,
    package_id: Option<Uuid>,
) -> ServiceResult<()> {
    if let Some(id) = treatment_id {
        if catalog.get_treatment(id).await?.is_none() {
            return Err(ServiceError::Validation(format!("Treatment {} does not exist", id)));
        }
    }
    if let Some(id) = package_id {
        if catalog.get_package(id).await?.is_none() {
            return Err(ServiceError::Validation(format!("Package {} does not exist", id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_data::repository::InMemoryStorage;

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("name", "  Rent ").unwrap(), "Rent");
        assert!(matches!(require_text("name", "   "), Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_services_share_storage() {
        let services = Services::new(InMemoryStorage::new(), BookingRules::default(), SessionStore::default());

        services.finance.create_category("Rent").await.unwrap();
        assert_eq!(services.finance.list_categories(false).await.unwrap().len(), 1);
        assert!(services.catalog.list_treatments(false).await.unwrap().is_empty());
    }
}
