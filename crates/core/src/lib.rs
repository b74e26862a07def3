//! `crm-core`: shared building blocks: error taxonomy, typed errors, ids.
//!
//! This crate has no HTTP or storage dependencies.

pub mod environment;
pub mod error;
pub mod id;
pub mod taxonomy;

pub use environment::Environment;
pub use error::{
    bad_request, conflict, database_error, forbidden, make_error, not_found, unauthorized,
    validation_error, AppError, AppResult, DomainError, FieldViolation, RepositoryError, TypedError,
};
pub use id::{DetailId, MenuId, RoleId, UserId};
pub use taxonomy::{describe, ErrorKind, KindInfo};
