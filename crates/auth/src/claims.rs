use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crm_core::{RoleId, UserId};

/// Identity a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub role_id: RoleId,
}

/// JWT claims carried by session tokens.
///
/// Timestamps are encoded as the registered `iat`/`exp` claims (seconds since
/// the epoch) so standard JWT tooling can read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub user_id: UserId,

    pub username: String,

    pub email: String,

    /// Role granted at issue time; drives menu lookup.
    pub role_id: RoleId,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn for_subject(subject: &TokenSubject, issued_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            user_id: subject.user_id,
            username: subject.username.clone(),
            email: subject.email.clone(),
            role_id: subject.role_id,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in [`crate::jwt`]; this only looks at the
/// claims themselves.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
