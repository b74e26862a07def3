use async_trait::async_trait;

use crm_core::{RepositoryError, UserId};

use crate::user::{Email, NewUser, ProfileUpdate, User, UserDetails};

/// Storage port for accounts and profile details.
///
/// `create` reports a duplicate email or username as
/// [`RepositoryError::UniqueViolation`] carrying the column name.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_details_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserDetails>, RepositoryError>;

    /// Create or replace the profile details of `user_id`.
    async fn upsert_details(
        &self,
        user_id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserDetails, RepositoryError>;
}
