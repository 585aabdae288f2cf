// PRISM Data
// This crate handles PostgreSQL access and the storage-level records

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
