//! Account flows: register, login, profile retrieval and update.
//!
//! Every failure leaves here as an [`AppError`]; nothing is swallowed or
//! re-wrapped on the way up to the HTTP error middleware.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::OnceCell;

use crm_auth::{PasswordHasher, TokenIssuer, TokenSubject, DEFAULT_ROLE_ID};
use crm_core::{
    not_found, unauthorized, validation_error, AppError, AppResult, FieldViolation,
    RepositoryError, UserId,
};

use crate::repository::UsersRepository;
use crate::user::{Email, NewUser, ProfileUpdate, Registration, User, UserInfo};

/// Same text for "no such account" and "wrong password".
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Verified against when the account does not exist, so a failed login costs
/// one hash verification either way.
const DUMMY_PASSWORD: &str = "crm-dummy-password";

#[derive(Clone)]
pub struct UsersService {
    repository: Arc<dyn UsersRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    dummy_hash: Arc<OnceCell<String>>,
}

impl UsersService {
    pub fn new(
        repository: Arc<dyn UsersRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            repository,
            hasher,
            tokens,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        Ok(self.repository.find_by_email(email).await?)
    }

    /// Create an account and return a session token for it.
    pub async fn register(&self, registration: Registration) -> AppResult<String> {
        if self.find_by_email(&registration.email).await?.is_some() {
            return Err(duplicate_account("email"));
        }

        let password_hash = self.hash_password(registration.password).await?;

        let created = match self
            .repository
            .create(NewUser {
                username: registration.username,
                email: registration.email,
                password_hash,
                role_id: DEFAULT_ROLE_ID,
            })
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent registration.
            Err(RepositoryError::UniqueViolation(field)) => return Err(duplicate_account(&field)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %created.user_id, "user registered");
        self.issue_token(&created)
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let user = match Email::parse(email) {
            Ok(email) => self.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            let dummy = self.dummy_hash().await?;
            self.verify_password(password, dummy).await?;
            tracing::warn!("login attempt for unknown account");
            return Err(unauthorized(Some(INVALID_CREDENTIALS)).into());
        };

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.user_id, "login attempt with wrong password");
            return Err(unauthorized(Some(INVALID_CREDENTIALS)).into());
        }

        tracing::info!(user_id = %user.user_id, "user logged in");
        self.issue_token(&user)
    }

    pub async fn user_info(&self, user_id: UserId) -> AppResult<UserInfo> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found(Some("User details not found")))?;

        let details = self
            .repository
            .find_details_by_user_id(user_id)
            .await?
            .ok_or_else(|| not_found(Some("User details not found")))?;

        Ok(UserInfo::from_parts(&user, details))
    }

    pub async fn update_profile(&self, user_id: UserId, profile: ProfileUpdate) -> AppResult<UserInfo> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| not_found(Some("User not found")))?;

        let details = self.repository.upsert_details(user_id, profile).await?;
        tracing::info!(user_id = %user_id, "profile details saved");
        Ok(UserInfo::from_parts(&user, details))
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        let subject = TokenSubject {
            user_id: user.user_id,
            username: user.username.clone(),
            email: user.email.to_string(),
            role_id: user.role_id,
        };
        let token = self
            .tokens
            .issue(&subject, Utc::now())
            .context("failed to issue session token")?;
        Ok(token)
    }

    async fn hash_password(&self, plain: String) -> AppResult<String> {
        let hasher = Arc::clone(&self.hasher);
        let result = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hashing task failed")?;
        Ok(result.context("failed to hash password")?)
    }

    async fn dummy_hash(&self) -> AppResult<&str> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD.to_string()))
            .await?;
        Ok(hash.as_str())
    }

    async fn verify_password(&self, plain: &str, hash: &str) -> AppResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let (plain, hash) = (plain.to_string(), hash.to_string());
        let result = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .context("password verification task failed")?;
        Ok(result.context("failed to verify password")?)
    }
}

fn duplicate_account(field: &str) -> AppError {
    let (message, reason) = match field {
        "email" => ("User with this email already exists", "Email already exists"),
        "username" => ("User with this username already exists", "Username already exists"),
        _ => ("User already exists", "Already exists"),
    };
    validation_error(Some(message), Some(FieldViolation::new(field, reason))).into()
}
