// prism-api lib.rs
//
// HTTP layer of the PRISM clinic backend: router, handlers, public DTOs,
// OpenAPI document and server configuration.

pub mod api;
pub mod config;
pub mod entities;
pub mod openapi;
