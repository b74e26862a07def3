use axum::http::StatusCode;

use crm_core::{bad_request, not_found};

use crate::app::errors::ApiError;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn fallback() -> ApiError {
    not_found(Some("Route not found")).into()
}

/// Known path, unsupported method.
pub async fn method_not_allowed() -> ApiError {
    bad_request(Some("Method not allowed")).into()
}
