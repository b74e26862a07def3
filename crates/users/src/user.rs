//! User account and profile records, plus the validated inputs that create them.

use serde::{Deserialize, Serialize};

use crm_core::{DetailId, DomainError, RoleId, UserId};

pub const USERNAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 100;
pub const NAME_MAX: usize = 50;
pub const SHORT_FIELD_MAX: usize = 20;
/// bcrypt ignores input past 72 bytes; refuse it rather than truncate silently.
pub const PASSWORD_MAX_BYTES: usize = 72;

// ─────────────────────────────────────────────────────────────────────────────
// Value objects
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::field("email", "must not be empty"));
        }
        if email.chars().count() > EMAIL_MAX {
            return Err(DomainError::field(
                "email",
                format!("must be at most {EMAIL_MAX} characters"),
            ));
        }
        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::field("email", "must be a valid email address"));
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || email.chars().any(char::is_whitespace)
        {
            return Err(DomainError::field("email", "must be a valid email address"));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn required_text(field: &str, value: Option<String>, max: usize) -> Result<String, DomainError> {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(DomainError::field(field, "must not be empty"));
    }
    if value.chars().count() > max {
        return Err(DomainError::field(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted user account. `password_hash` never leaves the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role_id: RoleId,
}

/// Row to insert; the store assigns `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role_id: RoleId,
}

/// Validated registration input. The password is still plaintext here.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: Email,
    pub password: String,
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Registration {
    pub fn parse(
        username: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Self, DomainError> {
        let username = required_text("username", username, USERNAME_MAX)?;
        let email = Email::parse(email.as_deref().unwrap_or_default())?;

        let password = password.unwrap_or_default();
        if password.trim().is_empty() {
            return Err(DomainError::field("password", "must not be empty"));
        }
        if password.len() > PASSWORD_MAX_BYTES {
            return Err(DomainError::field(
                "password",
                format!("must be at most {PASSWORD_MAX_BYTES} bytes"),
            ));
        }

        Ok(Self {
            username,
            email,
            password,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile details
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetails {
    pub detail_id: DetailId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub language: String,
    pub date_format: String,
    pub phone_number: String,
    pub profile_picture: Option<String>,
}

/// Validated profile editor input (create or replace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub language: String,
    pub date_format: String,
    pub phone_number: String,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn parse(
        first_name: Option<String>,
        last_name: Option<String>,
        language: Option<String>,
        date_format: Option<String>,
        phone_number: Option<String>,
        profile_picture: Option<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            first_name: required_text("firstName", first_name, NAME_MAX)?,
            last_name: required_text("lastName", last_name, NAME_MAX)?,
            language: required_text("language", language, SHORT_FIELD_MAX)?,
            date_format: required_text("dateFormat", date_format, SHORT_FIELD_MAX)?,
            phone_number: required_text("phoneNumber", phone_number, SHORT_FIELD_MAX)?,
            profile_picture: profile_picture
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        })
    }

    pub fn into_details(self, detail_id: DetailId, user_id: UserId) -> UserDetails {
        UserDetails {
            detail_id,
            user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            language: self.language,
            date_format: self.date_format,
            phone_number: self.phone_number,
            profile_picture: self.profile_picture,
        }
    }
}

/// Profile payload returned by `GET /users/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    pub language: String,
    pub date_format: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub username: String,
    pub email: String,
}

impl UserInfo {
    pub fn from_parts(user: &User, details: UserDetails) -> Self {
        Self {
            first_name: details.first_name,
            last_name: details.last_name,
            language: details.language,
            date_format: details.date_format,
            phone_number: details.phone_number,
            profile_picture: details.profile_picture,
            username: user.username.clone(),
            email: user.email.to_string(),
        }
    }
}
