//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They coordinate the metadata document and the stored binaries through the
//! DAO and enforce the project integrity rules.

pub mod project_service;
