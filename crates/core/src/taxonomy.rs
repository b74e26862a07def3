//! Error taxonomy: the fixed mapping from error kind to description and HTTP status.

use serde::{Deserialize, Serialize};

/// Discriminant identifying an error category.
///
/// Serialized as the variant name (e.g. `"Validation"`); clients key their
/// error handling off this value rather than off the HTTP status, since
/// several kinds share a status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Internal,
    Unauthorized,
    DatabaseError,
    NotFound,
    Validation,
    Forbidden,
    Conflict,
    BadRequest,
    RateLimitExceeded,
    ServiceUnavailable,
}

/// Taxonomy entry for a single [`ErrorKind`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KindInfo {
    pub description: &'static str,
    pub http_status: u16,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::Internal,
        ErrorKind::Unauthorized,
        ErrorKind::DatabaseError,
        ErrorKind::NotFound,
        ErrorKind::Validation,
        ErrorKind::Forbidden,
        ErrorKind::Conflict,
        ErrorKind::BadRequest,
        ErrorKind::RateLimitExceeded,
        ErrorKind::ServiceUnavailable,
    ];

    /// Look up the taxonomy entry for this kind.
    ///
    /// The match is exhaustive, so adding a kind without an entry fails to compile.
    pub const fn describe(self) -> KindInfo {
        let (description, http_status) = match self {
            ErrorKind::Internal => ("Internal Server Error", 500),
            ErrorKind::Unauthorized => ("Unauthorized", 401),
            ErrorKind::DatabaseError => ("Database Error", 500),
            ErrorKind::NotFound => ("Not Found", 404),
            ErrorKind::Validation => ("Validation Error", 400),
            ErrorKind::Forbidden => ("Forbidden", 403),
            ErrorKind::Conflict => ("Conflict", 409),
            ErrorKind::BadRequest => ("Bad Request", 400),
            ErrorKind::RateLimitExceeded => ("Rate Limit Exceeded", 429),
            ErrorKind::ServiceUnavailable => ("Service Unavailable", 503),
        };
        KindInfo {
            description,
            http_status,
        }
    }

    pub const fn http_status(self) -> u16 {
        self.describe().http_status
    }

    pub const fn description(self) -> &'static str {
        self.describe().description
    }

    /// Variant name as it appears in the `errorName` field of an envelope.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::DatabaseError => "DatabaseError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Validation => "Validation",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::RateLimitExceeded => "RateLimitExceeded",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-function form of [`ErrorKind::describe`].
pub const fn describe(kind: ErrorKind) -> KindInfo {
    kind.describe()
}
