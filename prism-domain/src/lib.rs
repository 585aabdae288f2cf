// PRISM Domain
// Business rules for the PRISM clinic management application

// Services that implement business logic
pub mod services;

// Sessions, the authentication guard and role checks
pub mod auth;

// Slot and calendar arithmetic for bookings
pub mod booking;

// Service inputs and computed results
pub mod entities;

// Service error type
pub mod error;

// Health checks and system status
pub mod health;

// Re-export the database module from prism-data for convenience
pub use prism_data::database;

pub use error::{ServiceError, ServiceResult};
