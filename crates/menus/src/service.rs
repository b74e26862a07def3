use std::sync::Arc;

use crm_core::{not_found, AppResult, MenuId, RoleId};

use crate::menu::{Menu, MenuUpdate, NewMenu, RoleMenu};
use crate::repository::MenuRepository;

pub const MENU_NOT_FOUND: &str = "Menu not found";

#[derive(Clone)]
pub struct MenusService {
    repository: Arc<dyn MenuRepository>,
}

impl MenusService {
    pub fn new(repository: Arc<dyn MenuRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, menu: NewMenu) -> AppResult<Menu> {
        let created = self.repository.create(menu).await?;
        tracing::info!(menu_id = %created.menu_id, "menu created");
        Ok(created)
    }

    /// Unknown roles simply have no menus.
    pub async fn menus_for_role(&self, role_id: RoleId) -> AppResult<Vec<Menu>> {
        Ok(self.repository.find_by_role(role_id).await?)
    }

    pub async fn details(&self, menu_id: MenuId) -> AppResult<Menu> {
        self.repository
            .find_by_id(menu_id)
            .await?
            .ok_or_else(|| not_found(Some(MENU_NOT_FOUND)).into())
    }

    pub async fn update(&self, menu_id: MenuId, update: MenuUpdate) -> AppResult<Menu> {
        let menu = self
            .repository
            .update(menu_id, update)
            .await?
            .ok_or_else(|| not_found(Some(MENU_NOT_FOUND)))?;
        tracing::info!(menu_id = %menu_id, "menu updated");
        Ok(menu)
    }

    pub async fn delete(&self, menu_id: MenuId) -> AppResult<()> {
        if !self.repository.delete(menu_id).await? {
            return Err(not_found(Some(MENU_NOT_FOUND)).into());
        }
        tracing::info!(menu_id = %menu_id, "menu deleted");
        Ok(())
    }

    pub async fn assign_to_role(&self, role_id: RoleId, menu_id: MenuId) -> AppResult<RoleMenu> {
        if self.repository.find_role(role_id).await?.is_none() {
            return Err(not_found(Some("Role not found")).into());
        }
        if self.repository.find_by_id(menu_id).await?.is_none() {
            return Err(not_found(Some(MENU_NOT_FOUND)).into());
        }
        let grant = self
            .repository
            .assign_to_role(RoleMenu { role_id, menu_id })
            .await?;
        tracing::info!(role_id = %role_id, menu_id = %menu_id, "menu assigned to role");
        Ok(grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use crm_auth::{Role, DEFAULT_ROLE_ID};
    use crm_core::{ErrorKind, RepositoryError};

    #[derive(Default)]
    struct FakeRepo {
        menus: Mutex<BTreeMap<MenuId, Menu>>,
        grants: Mutex<BTreeSet<(RoleId, MenuId)>>,
    }

    #[async_trait]
    impl MenuRepository for FakeRepo {
        async fn create(&self, menu: NewMenu) -> Result<Menu, RepositoryError> {
            let mut menus = self.menus.lock().unwrap();
            let menu = menu.into_menu(MenuId::new(menus.len() as i64 + 1));
            menus.insert(menu.menu_id, menu.clone());
            Ok(menu)
        }

        async fn find_by_id(&self, menu_id: MenuId) -> Result<Option<Menu>, RepositoryError> {
            Ok(self.menus.lock().unwrap().get(&menu_id).cloned())
        }

        async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<Menu>, RepositoryError> {
            let grants = self.grants.lock().unwrap();
            let menus = self.menus.lock().unwrap();
            Ok(grants
                .iter()
                .filter(|(r, _)| *r == role_id)
                .filter_map(|(_, m)| menus.get(m).cloned())
                .collect())
        }

        async fn update(
            &self,
            menu_id: MenuId,
            update: MenuUpdate,
        ) -> Result<Option<Menu>, RepositoryError> {
            let mut menus = self.menus.lock().unwrap();
            Ok(menus.get_mut(&menu_id).map(|menu| {
                update.apply(menu);
                menu.clone()
            }))
        }

        async fn delete(&self, menu_id: MenuId) -> Result<bool, RepositoryError> {
            self.grants.lock().unwrap().retain(|(_, m)| *m != menu_id);
            Ok(self.menus.lock().unwrap().remove(&menu_id).is_some())
        }

        async fn assign_to_role(&self, grant: RoleMenu) -> Result<RoleMenu, RepositoryError> {
            self.grants.lock().unwrap().insert((grant.role_id, grant.menu_id));
            Ok(grant)
        }

        async fn find_role(&self, role_id: RoleId) -> Result<Option<Role>, RepositoryError> {
            Ok((role_id == DEFAULT_ROLE_ID).then(|| Role::new(role_id, "user")))
        }
    }

    fn service() -> MenusService {
        MenusService::new(Arc::new(FakeRepo::default()))
    }

    fn new_menu(name: &str) -> NewMenu {
        NewMenu::parse(Some(name.into()), Some("/x".into()), Some("icon".into())).unwrap()
    }

    fn kind_of(err: &crm_core::AppError) -> ErrorKind {
        err.as_typed().expect("typed error").kind()
    }

    #[tokio::test]
    async fn unknown_role_has_no_menus() {
        let menus = service().menus_for_role(RoleId::new(42)).await.unwrap();
        assert!(menus.is_empty());
    }

    #[tokio::test]
    async fn assigned_menus_are_listed_for_the_role() {
        let svc = service();
        let a = svc.create(new_menu("A")).await.unwrap();
        svc.create(new_menu("B")).await.unwrap();

        svc.assign_to_role(DEFAULT_ROLE_ID, a.menu_id).await.unwrap();
        svc.assign_to_role(DEFAULT_ROLE_ID, a.menu_id).await.unwrap();

        let menus = svc.menus_for_role(DEFAULT_ROLE_ID).await.unwrap();
        assert_eq!(menus, vec![a]);
    }

    #[tokio::test]
    async fn missing_menu_is_not_found_everywhere() {
        let svc = service();
        let missing = MenuId::new(9);

        let err = svc.details(missing).await.unwrap_err();
        assert_eq!(kind_of(&err), ErrorKind::NotFound);
        assert_eq!(err.as_typed().unwrap().message(), "Menu not found");

        let update = MenuUpdate::parse(Some("n".into()), None, None).unwrap();
        assert_eq!(kind_of(&svc.update(missing, update).await.unwrap_err()), ErrorKind::NotFound);
        assert_eq!(kind_of(&svc.delete(missing).await.unwrap_err()), ErrorKind::NotFound);
        assert_eq!(
            kind_of(&svc.assign_to_role(DEFAULT_ROLE_ID, missing).await.unwrap_err()),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn assigning_to_unknown_role_is_not_found() {
        let svc = service();
        let menu = svc.create(new_menu("A")).await.unwrap();
        let err = svc.assign_to_role(RoleId::new(5), menu.menu_id).await.unwrap_err();
        assert_eq!(err.as_typed().unwrap().message(), "Role not found");
    }

    #[tokio::test]
    async fn delete_revokes_grants() {
        let svc = service();
        let menu = svc.create(new_menu("A")).await.unwrap();
        svc.assign_to_role(DEFAULT_ROLE_ID, menu.menu_id).await.unwrap();

        svc.delete(menu.menu_id).await.unwrap();
        assert!(svc.menus_for_role(DEFAULT_ROLE_ID).await.unwrap().is_empty());
    }
}
