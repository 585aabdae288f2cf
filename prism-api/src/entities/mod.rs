// Public entities for the PRISM API
// Request and response bodies exchanged with the client; storage records
// never cross this boundary directly.

pub mod accounts;
pub mod appointments;
pub mod booking;
pub mod catalog;
pub mod common;
pub mod finance;
pub mod patients;
