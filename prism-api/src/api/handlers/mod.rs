pub mod appointments;
pub mod auth;
pub mod booking;
pub mod catalog;
pub mod finance;
pub mod health;
pub mod patients;

pub use health::health_check;
