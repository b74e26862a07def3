use async_trait::async_trait;

use crm_auth::Role;
use crm_core::{MenuId, RepositoryError, RoleId};

use crate::menu::{Menu, MenuUpdate, NewMenu, RoleMenu};

/// Storage port for menus and role grants.
///
/// Deleting a menu also removes its grants.
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn create(&self, menu: NewMenu) -> Result<Menu, RepositoryError>;

    async fn find_by_id(&self, menu_id: MenuId) -> Result<Option<Menu>, RepositoryError>;

    /// Menus granted to `role_id`, ordered by id.
    async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<Menu>, RepositoryError>;

    /// `None` when the menu does not exist.
    async fn update(&self, menu_id: MenuId, update: MenuUpdate)
    -> Result<Option<Menu>, RepositoryError>;

    /// `false` when the menu does not exist.
    async fn delete(&self, menu_id: MenuId) -> Result<bool, RepositoryError>;

    /// Idempotent: granting an already granted menu is not an error.
    async fn assign_to_role(&self, grant: RoleMenu) -> Result<RoleMenu, RepositoryError>;

    async fn find_role(&self, role_id: RoleId) -> Result<Option<Role>, RepositoryError>;
}
