pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

#[cfg(test)]
mod routes_tests;

pub use routes::{build_state, create_app, AppState};
