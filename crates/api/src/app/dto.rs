use serde::{Deserialize, Serialize};

use crm_core::{DomainError, MenuId};
use crm_menus::{MenuUpdate, NewMenu};
use crm_users::{ProfileUpdate, Registration};

// -------------------------
// Request DTOs
// -------------------------
//
// Fields are optional so that a missing field surfaces as a field-level
// validation error instead of a body rejection.

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, DomainError> {
        Registration::parse(self.username, self.email, self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// `(email, password)`, both present and non-blank.
    pub fn into_credentials(self) -> Result<(String, String), DomainError> {
        let email = self.email.filter(|e| !e.trim().is_empty());
        let password = self.password.filter(|p| !p.is_empty());
        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            (None, _) => Err(DomainError::field("email", "must not be empty")),
            (_, None) => Err(DomainError::field("password", "must not be empty")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Option<String>,
    pub date_format: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileRequest {
    pub fn into_update(self) -> Result<ProfileUpdate, DomainError> {
        ProfileUpdate::parse(
            self.first_name,
            self.last_name,
            self.language,
            self.date_format,
            self.phone_number,
            self.profile_picture,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuRequest {
    pub menu_name: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
}

impl CreateMenuRequest {
    pub fn into_menu(self) -> Result<NewMenu, DomainError> {
        NewMenu::parse(self.menu_name, self.href, self.icon)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuRequest {
    pub menu_name: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
}

impl UpdateMenuRequest {
    pub fn into_update(self) -> Result<MenuUpdate, DomainError> {
        MenuUpdate::parse(self.menu_name, self.href, self.icon)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignMenuRequest {
    pub menu_id: Option<i64>,
}

impl AssignMenuRequest {
    pub fn menu_id(&self) -> Result<MenuId, DomainError> {
        match self.menu_id {
            Some(id) if id > 0 => Ok(MenuId::new(id)),
            Some(_) => Err(DomainError::field("menuId", "must be a positive integer")),
            None => Err(DomainError::field("menuId", "must not be empty")),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
