use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use prism_data::models::{
    NewPackage, NewTreatment, Package, PackageUpdate, Treatment, TreatmentUpdate, MAX_AMOUNT,
};
use prism_data::repository::CatalogRepositoryTrait;

use crate::error::{ServiceError, ServiceResult};
use crate::services::require_text;

#[async_trait]
pub trait CatalogServiceTrait: Send + Sync {
    async fn create_treatment(&self, treatment: NewTreatment) -> ServiceResult<Treatment>;

    async fn list_treatments(&self, include_archived: bool) -> ServiceResult<Vec<Treatment>>;

    async fn update_treatment(&self, id: Uuid, update: TreatmentUpdate) -> ServiceResult<Treatment>;

    async fn set_treatment_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Treatment>;

    async fn create_package(&self, package: NewPackage) -> ServiceResult<Package>;

    async fn list_packages(&self, include_archived: bool) -> ServiceResult<Vec<Package>>;

    async fn update_package(&self, id: Uuid, update: PackageUpdate) -> ServiceResult<Package>;

    async fn set_package_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Package>;
}

pub struct CatalogService<C: CatalogRepositoryTrait> {
    repository: C,
}

impl<C: CatalogRepositoryTrait> CatalogService<C> {
    pub fn new(repository: C) -> Self {
        Self { repository }
    }

    async fn ensure_treatments_exist(&self, treatment_ids: &[Uuid]) -> ServiceResult<()> {
        for id in treatment_ids {
            if self.repository.get_treatment(*id).await?.is_none() {
                return Err(ServiceError::Validation(format!("Treatment {} does not exist", id)));
            }
        }
        Ok(())
    }
}

fn validate_price(price: i64) -> ServiceResult<()> {
    if !(0..=MAX_AMOUNT).contains(&price) {
        return Err(ServiceError::Validation(format!(
            "Price must be between 0 and {} centavos",
            MAX_AMOUNT
        )));
    }
    Ok(())
}

fn validate_duration(minutes: i32) -> ServiceResult<()> {
    if minutes <= 0 {
        return Err(ServiceError::Validation("Duration must be positive".to_string()));
    }
    Ok(())
}

fn validate_sessions(sessions: i32) -> ServiceResult<()> {
    if sessions < 1 {
        return Err(ServiceError::Validation("A package needs at least one session".to_string()));
    }
    Ok(())
}

#[async_trait]
impl<C: CatalogRepositoryTrait> CatalogServiceTrait for CatalogService<C> {
    async fn create_treatment(&self, mut treatment: NewTreatment) -> ServiceResult<Treatment> {
        treatment.name = require_text("name", &treatment.name)?;
        validate_price(treatment.price)?;
        validate_duration(treatment.duration_minutes)?;

        let created = self.repository.create_treatment(treatment).await?;
        info!("Created treatment {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn list_treatments(&self, include_archived: bool) -> ServiceResult<Vec<Treatment>> {
        Ok(self.repository.list_treatments(include_archived).await?)
    }

    async fn update_treatment(&self, id: Uuid, mut update: TreatmentUpdate) -> ServiceResult<Treatment> {
        if let Some(name) = &update.name {
            update.name = Some(require_text("name", name)?);
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(minutes) = update.duration_minutes {
            validate_duration(minutes)?;
        }

        self.repository
            .update_treatment(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Treatment {} not found", id)))
    }

    async fn set_treatment_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Treatment> {
        self.repository
            .set_treatment_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Treatment {} not found", id)))
    }

    async fn create_package(&self, mut package: NewPackage) -> ServiceResult<Package> {
        package.name = require_text("name", &package.name)?;
        validate_price(package.price)?;
        validate_sessions(package.sessions)?;
        if package.treatment_ids.is_empty() {
            return Err(ServiceError::Validation(
                "A package must include at least one treatment".to_string(),
            ));
        }
        self.ensure_treatments_exist(&package.treatment_ids).await?;

        let created = self.repository.create_package(package).await?;
        info!("Created package {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn list_packages(&self, include_archived: bool) -> ServiceResult<Vec<Package>> {
        Ok(self.repository.list_packages(include_archived).await?)
    }

    async fn update_package(&self, id: Uuid, mut update: PackageUpdate) -> ServiceResult<Package> {
        if let Some(name) = &update.name {
            update.name = Some(require_text("name", name)?);
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(sessions) = update.sessions {
            validate_sessions(sessions)?;
        }
        if let Some(treatment_ids) = &update.treatment_ids {
            if treatment_ids.is_empty() {
                return Err(ServiceError::Validation(
                    "A package must include at least one treatment".to_string(),
                ));
            }
            self.ensure_treatments_exist(treatment_ids).await?;
        }

        self.repository
            .update_package(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Package {} not found", id)))
    }

    async fn set_package_archived(&self, id: Uuid, archived: bool) -> ServiceResult<Package> {
        self.repository
            .set_package_archived(id, archived)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Package {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_data::repository::InMemoryStorage;

    fn facial() -> NewTreatment {
        NewTreatment {
            name: "  Facial  ".to_string(),
            description: None,
            price: 150_000,
            duration_minutes: 60,
        }
    }

    #[tokio::test]
    async fn test_treatment_lifecycle() {
        let service = CatalogService::new(InMemoryStorage::new());
        let created = service.create_treatment(facial()).await.unwrap();
        assert_eq!(created.name, "Facial");

        let update = TreatmentUpdate { price: Some(175_000), ..Default::default() };
        let updated = service.update_treatment(created.id, update).await.unwrap();
        assert_eq!(updated.price, 175_000);
        assert_eq!(updated.duration_minutes, 60);

        service.set_treatment_archived(created.id, true).await.unwrap();
        assert!(service.list_treatments(false).await.unwrap().is_empty());
        assert_eq!(service.list_treatments(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_treatment_validation() {
        let service = CatalogService::new(InMemoryStorage::new());

        let mut negative = facial();
        negative.price = -1;
        assert!(matches!(service.create_treatment(negative).await, Err(ServiceError::Validation(_))));

        let mut blank = facial();
        blank.name = "   ".to_string();
        assert!(matches!(service.create_treatment(blank).await, Err(ServiceError::Validation(_))));

        let mut instant = facial();
        instant.duration_minutes = 0;
        assert!(matches!(service.create_treatment(instant).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_package_requires_existing_treatments() {
        let service = CatalogService::new(InMemoryStorage::new());
        let treatment = service.create_treatment(facial()).await.unwrap();

        let package = NewPackage {
            name: "Glow bundle".to_string(),
            description: None,
            price: 600_000,
            sessions: 5,
            treatment_ids: vec![treatment.id],
        };
        let created = service.create_package(package.clone()).await.unwrap();
        assert_eq!(created.treatment_ids, vec![treatment.id]);

        let bogus = NewPackage { treatment_ids: vec![Uuid::new_v4()], ..package.clone() };
        assert!(matches!(service.create_package(bogus).await, Err(ServiceError::Validation(_))));

        let empty = NewPackage { treatment_ids: Vec::new(), ..package };
        assert!(matches!(service.create_package(empty).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_missing_package() {
        let service = CatalogService::new(InMemoryStorage::new());
        let result = service.update_package(Uuid::new_v4(), PackageUpdate::default()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
