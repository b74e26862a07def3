use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crm_auth::JwtValidator;
use crm_core::{unauthorized, TypedError};

use crate::app::errors::ApiError;
use crate::context::AuthenticatedUser;

pub const TOKEN_REQUIRED: &str = "Token is required";
pub const INVALID_TOKEN: &str = "Invalid token";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Rejects the request before any handler runs unless it carries a valid
/// bearer token; on success the caller is available as an
/// `Extension<AuthenticatedUser>`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::info!(error = %e, "rejected bearer token");
        unauthorized(Some(INVALID_TOKEN))
    })?;

    req.extensions_mut().insert(AuthenticatedUser::from(claims));

    Ok(next.run(req).await)
}

/// Token part of `Authorization: Bearer <token>`.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, TypedError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some(TOKEN_REQUIRED)))?;

    let header = header
        .to_str()
        .map_err(|_| unauthorized(Some(INVALID_TOKEN)))?;

    let header = header.trim();
    if header.is_empty() {
        return Err(unauthorized(Some(TOKEN_REQUIRED)));
    }

    // Scheme matching is case-insensitive.
    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(unauthorized(Some(INVALID_TOKEN)));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(unauthorized(Some(TOKEN_REQUIRED)));
    }

    Ok(token)
}
