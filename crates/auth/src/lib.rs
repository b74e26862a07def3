//! `crm-auth`: credentials: JWT issue/verify and password hashing.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod roles;

pub use claims::{validate_claims, JwtClaims, TokenSubject, TokenValidationError};
pub use jwt::{Hs256Jwt, JwtValidator, TokenError, TokenIssuer};
pub use password::{BcryptHasher, PasswordError, PasswordHasher};
pub use roles::{Role, DEFAULT_ROLE_ID};
