// Repository module structure
pub mod errors;
mod accounts;
mod appointments;
mod catalog;
mod finance;
mod in_memory;
mod patients;
mod storage;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use accounts::AccountRepositoryTrait;
pub use appointments::AppointmentRepositoryTrait;
pub use catalog::CatalogRepositoryTrait;
pub use finance::FinanceRepositoryTrait;
pub use patients::PatientRepositoryTrait;
pub use in_memory::InMemoryStorage;
pub use storage::PostgresStorage;

#[cfg(feature = "mock")]
pub use accounts::MockAccountRepositoryTrait;
#[cfg(feature = "mock")]
pub use appointments::MockAppointmentRepositoryTrait;
#[cfg(feature = "mock")]
pub use catalog::MockCatalogRepositoryTrait;
#[cfg(feature = "mock")]
pub use finance::MockFinanceRepositoryTrait;
#[cfg(feature = "mock")]
pub use patients::MockPatientRepositoryTrait;

/// Every repository trait at once; what the application's storage must provide
pub trait ClinicStorage:
    AccountRepositoryTrait
    + PatientRepositoryTrait
    + AppointmentRepositoryTrait
    + CatalogRepositoryTrait
    + FinanceRepositoryTrait
{
}

impl<T> ClinicStorage for T where
    T: AccountRepositoryTrait
        + PatientRepositoryTrait
        + AppointmentRepositoryTrait
        + CatalogRepositoryTrait
        + FinanceRepositoryTrait
{
}
