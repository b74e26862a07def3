//! Typed error model shared by every layer.
//!
//! A [`TypedError`] is created at the point of failure and travels unchanged
//! until the HTTP layer renders it into an error envelope.

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use crate::environment::Environment;
use crate::taxonomy::ErrorKind;

/// Result type used across the service and handler layers.
pub type AppResult<T> = Result<T, AppError>;

/// Failure travelling from a service to the HTTP error middleware.
///
/// `Typed` failures are rendered as-is; `Unexpected` ones are logged with a
/// fresh correlation id and surfaced as `Internal`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Typed(#[from] TypedError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    pub fn as_typed(&self) -> Option<&TypedError> {
        match self {
            AppError::Typed(e) => Some(e),
            AppError::Unexpected(_) => None,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::Typed(err.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Typed(err.into())
    }
}

/// Immutable, kind-tagged error value.
///
/// `status_code` is always the taxonomy status of `kind`; there is no way to
/// set it independently.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TypedError {
    kind: ErrorKind,
    message: String,
    data: Option<JsonValue>,
    correlation_id: Uuid,
    status_code: u16,
}

impl TypedError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&JsonValue> {
        self.data.as_ref()
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Wrap a foreign failure as `Internal`.
    ///
    /// The original message survives only outside production; in production
    /// the client sees the taxonomy description.
    pub fn from_unknown(err: impl core::fmt::Display, environment: Environment) -> Self {
        if environment.is_production() {
            make_error(ErrorKind::Internal, None, None)
        } else {
            make_error(ErrorKind::Internal, Some(err.to_string()), None)
        }
    }
}

impl PartialEq for TypedError {
    fn eq(&self, other: &Self) -> bool {
        self.correlation_id == other.correlation_id
    }
}

impl Eq for TypedError {}

/// Build a [`TypedError`] for `kind`.
///
/// `message` falls back to the taxonomy description. Never fails.
pub fn make_error(
    kind: ErrorKind,
    message: Option<String>,
    data: Option<JsonValue>,
) -> TypedError {
    let info = kind.describe();
    TypedError {
        kind,
        message: message.unwrap_or_else(|| info.description.to_string()),
        data,
        correlation_id: Uuid::new_v4(),
        status_code: info.http_status,
    }
}

/// Payload attached to validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn into_data(self) -> JsonValue {
        serde_json::json!({ "field": self.field, "reason": self.reason })
    }
}

pub fn unauthorized(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::Unauthorized, message.map(str::to_string), None)
}

pub fn database_error(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::DatabaseError, message.map(str::to_string), None)
}

pub fn not_found(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::NotFound, message.map(str::to_string), None)
}

pub fn validation_error(message: Option<&str>, data: Option<FieldViolation>) -> TypedError {
    make_error(
        ErrorKind::Validation,
        message.map(str::to_string),
        data.map(FieldViolation::into_data),
    )
}

pub fn forbidden(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::Forbidden, message.map(str::to_string), None)
}

pub fn conflict(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::Conflict, message.map(str::to_string), None)
}

pub fn bad_request(message: Option<&str>) -> TypedError {
    make_error(ErrorKind::BadRequest, message.map(str::to_string), None)
}

/// Deterministic failure of a value constructor (parsing, validation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A field-level validation failure.
    #[error("{field}: {reason}")]
    Field { field: String, reason: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

impl From<DomainError> for TypedError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => validation_error(Some(&msg), None),
            DomainError::Field { field, reason } => validation_error(
                Some(&format!("Invalid {field}")),
                Some(FieldViolation::new(field, reason)),
            ),
            DomainError::InvalidId(msg) => bad_request(Some(&msg)),
        }
    }
}

/// Failure reported by a persistence adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A unique key (e.g. email) is already taken.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

impl From<RepositoryError> for TypedError {
    fn from(err: RepositoryError) -> Self {
        let typed = database_error(None);
        tracing::error!(
            correlation_id = %typed.correlation_id(),
            error = %err,
            "persistence failure"
        );
        typed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn make_error_resolves_status_for_every_kind() {
        for kind in ErrorKind::ALL {
            let err = make_error(kind, None, None);
            assert_eq!(err.status_code(), kind.describe().http_status);
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn message_defaults_to_taxonomy_description() {
        let err = make_error(ErrorKind::NotFound, None, None);
        assert_eq!(err.message(), "Not Found");

        let err = not_found(Some("Menu not found"));
        assert_eq!(err.message(), "Menu not found");
    }

    #[test]
    fn identical_arguments_yield_distinct_correlation_ids() {
        let a = make_error(ErrorKind::Conflict, Some("x".into()), None);
        let b = make_error(ErrorKind::Conflict, Some("x".into()), None);
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn validation_error_carries_field_payload() {
        let err = validation_error(
            Some("User with this email already exists"),
            Some(FieldViolation::new("email", "Email already exists")),
        );
        assert_eq!(err.status_code(), 400);
        let data = err.data().unwrap();
        assert_eq!(data["field"], "email");
        assert_eq!(data["reason"], "Email already exists");
    }

    #[test]
    fn from_unknown_hides_message_in_production() {
        let prod = TypedError::from_unknown("socket closed", Environment::Production);
        assert_eq!(prod.kind(), ErrorKind::Internal);
        assert_eq!(prod.message(), "Internal Server Error");

        let dev = TypedError::from_unknown("socket closed", Environment::Development);
        assert_eq!(dev.message(), "socket closed");
        assert_eq!(dev.status_code(), 500);
    }

    #[test]
    fn field_errors_become_validation_with_payload() {
        let err: TypedError = DomainError::field("username", "must not be blank").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Invalid username");
        assert_eq!(err.data().unwrap()["reason"], "must not be blank");

        let err: TypedError = DomainError::invalid_id("MenuId: abc").into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn repository_errors_surface_as_database_errors() {
        let err: TypedError = RepositoryError::backend("deadlock detected").into();
        assert_eq!(err.kind(), ErrorKind::DatabaseError);
        assert_eq!(err.message(), "Database Error");
    }

    fn any_kind() -> impl Strategy<Value = ErrorKind> {
        (0..ErrorKind::ALL.len()).prop_map(|i| ErrorKind::ALL[i])
    }

    proptest! {
        #[test]
        fn status_always_follows_kind(kind in any_kind(), msg in proptest::option::of(".{0,40}")) {
            let err = make_error(kind, msg.clone(), None);
            prop_assert_eq!(err.status_code(), kind.http_status());
            match msg {
                Some(m) => prop_assert_eq!(err.message(), m.as_str()),
                None => prop_assert_eq!(err.message(), kind.description()),
            }
        }
    }
}
