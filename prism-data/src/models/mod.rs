//! Storage models for every table in the clinic schema.
//!
//! Money columns are minor currency units (centavos) held in `i64`.

/// Upper bound for any single money field, in centavos (one billion pesos)
pub const MAX_AMOUNT: i64 = 100_000_000_000;

pub mod account;
pub mod appointment;
pub mod catalog;
pub mod finance;
pub mod patient;

pub use account::{Account, AccountUpdate, NewAccount, Role};
pub use appointment::{
    Appointment, AppointmentFilter, BookedSlot, ConfirmedBooking, NewAppointment,
    NewStagedAppointment, StagedAppointment, StagedConfirmation, StagedStatus,
};
pub use catalog::{NewPackage, NewTreatment, Package, PackageUpdate, Treatment, TreatmentUpdate};
pub use finance::{
    Category, CategoryUpdate, Expense, ExpenseFilter, ExpenseUpdate, NewCategory, NewExpense,
    NewSale, Sale, SaleFilter,
};
pub use patient::{
    NewPatientRecord, PatientRecord, PatientRecordFilter, PatientRecordUpdate, PaymentMethod,
};
