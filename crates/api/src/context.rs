use crm_auth::JwtClaims;
use crm_core::{RoleId, UserId};

/// Identity of the caller, derived from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    user_id: UserId,
    username: String,
    email: String,
    role_id: RoleId,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role_id(&self) -> RoleId {
        self.role_id
    }
}

impl From<JwtClaims> for AuthenticatedUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
            email: claims.email,
            role_id: claims.role_id,
        }
    }
}
