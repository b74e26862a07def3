use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crm_auth::{Role, DEFAULT_ROLE_ID};
use crm_core::{DetailId, MenuId, RepositoryError, RoleId, UserId};
use crm_menus::{Menu, MenuRepository, MenuUpdate, NewMenu, RoleMenu};
use crm_users::{Email, NewUser, ProfileUpdate, User, UserDetails, UsersRepository};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, RepositoryError> {
    lock.read()
        .map_err(|_| RepositoryError::backend("lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, RepositoryError> {
    lock.write()
        .map_err(|_| RepositoryError::backend("lock poisoned"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct UsersState {
    users: BTreeMap<UserId, User>,
    details: HashMap<UserId, UserDetails>,
    last_user_id: i64,
    last_detail_id: i64,
}

/// In-memory users store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUsersRepository {
    state: RwLock<UsersState>,
}

impl InMemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = read(&self.state)?;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(read(&self.state)?.users.get(&user_id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = write(&self.state)?;

        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::UniqueViolation("email".to_string()));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::UniqueViolation("username".to_string()));
        }

        state.last_user_id += 1;
        let created = User {
            user_id: UserId::new(state.last_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role_id: user.role_id,
        };
        state.users.insert(created.user_id, created.clone());
        Ok(created)
    }

    async fn find_details_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserDetails>, RepositoryError> {
        Ok(read(&self.state)?.details.get(&user_id).cloned())
    }

    async fn upsert_details(
        &self,
        user_id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserDetails, RepositoryError> {
        let mut state = write(&self.state)?;

        let detail_id = match state.details.get(&user_id) {
            Some(existing) => existing.detail_id,
            None => {
                state.last_detail_id += 1;
                DetailId::new(state.last_detail_id)
            }
        };

        let details = profile.into_details(detail_id, user_id);
        state.details.insert(user_id, details.clone());
        Ok(details)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Menus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct MenusState {
    roles: BTreeMap<RoleId, Role>,
    menus: BTreeMap<MenuId, Menu>,
    grants: BTreeSet<(RoleId, MenuId)>,
    last_menu_id: i64,
}

/// In-memory menu store for tests/dev. Starts with the default role seeded.
#[derive(Debug)]
pub struct InMemoryMenuRepository {
    state: RwLock<MenusState>,
}

impl InMemoryMenuRepository {
    pub fn new() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(DEFAULT_ROLE_ID, Role::new(DEFAULT_ROLE_ID, "user"));
        Self {
            state: RwLock::new(MenusState {
                roles,
                menus: BTreeMap::new(),
                grants: BTreeSet::new(),
                last_menu_id: 0,
            }),
        }
    }

    /// Register an extra role (the default one is always present).
    pub fn with_role(self, role: Role) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.roles.insert(role.role_id, role);
        }
        self
    }
}

impl Default for InMemoryMenuRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MenuRepository for InMemoryMenuRepository {
    async fn create(&self, menu: NewMenu) -> Result<Menu, RepositoryError> {
        let mut state = write(&self.state)?;
        state.last_menu_id += 1;
        let menu = menu.into_menu(MenuId::new(state.last_menu_id));
        state.menus.insert(menu.menu_id, menu.clone());
        Ok(menu)
    }

    async fn find_by_id(&self, menu_id: MenuId) -> Result<Option<Menu>, RepositoryError> {
        Ok(read(&self.state)?.menus.get(&menu_id).cloned())
    }

    async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<Menu>, RepositoryError> {
        let state = read(&self.state)?;
        Ok(state
            .grants
            .range((role_id, MenuId::new(i64::MIN))..=(role_id, MenuId::new(i64::MAX)))
            .filter_map(|(_, menu_id)| state.menus.get(menu_id).cloned())
            .collect())
    }

    async fn update(
        &self,
        menu_id: MenuId,
        update: MenuUpdate,
    ) -> Result<Option<Menu>, RepositoryError> {
        let mut state = write(&self.state)?;
        Ok(state.menus.get_mut(&menu_id).map(|menu| {
            update.apply(menu);
            menu.clone()
        }))
    }

    async fn delete(&self, menu_id: MenuId) -> Result<bool, RepositoryError> {
        let mut state = write(&self.state)?;
        state.grants.retain(|(_, m)| *m != menu_id);
        Ok(state.menus.remove(&menu_id).is_some())
    }

    async fn assign_to_role(&self, grant: RoleMenu) -> Result<RoleMenu, RepositoryError> {
        let mut state = write(&self.state)?;
        if !state.roles.contains_key(&grant.role_id) || !state.menus.contains_key(&grant.menu_id) {
            return Err(RepositoryError::backend(format!(
                "grant references a missing row: {grant:?}"
            )));
        }
        state.grants.insert((grant.role_id, grant.menu_id));
        Ok(grant)
    }

    async fn find_role(&self, role_id: RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(read(&self.state)?.roles.get(&role_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: Email::parse(email).unwrap(),
            password_hash: "$2b$04$hash".to_string(),
            role_id: DEFAULT_ROLE_ID,
        }
    }

    fn profile(first_name: &str) -> ProfileUpdate {
        ProfileUpdate::parse(
            Some(first_name.into()),
            Some("Lovelace".into()),
            Some("en".into()),
            Some("YYYY-MM-DD".into()),
            Some("555".into()),
            None,
        )
        .unwrap()
    }

    fn new_menu(name: &str) -> NewMenu {
        NewMenu::parse(Some(name.into()), Some("/x".into()), Some("icon".into())).unwrap()
    }

    #[tokio::test]
    async fn users_get_sequential_ids_and_are_found_by_email() {
        let repo = InMemoryUsersRepository::new();
        let a = repo.create(new_user("a", "a@x.com")).await.unwrap();
        let b = repo.create(new_user("b", "b@x.com")).await.unwrap();
        assert_eq!(a.user_id, UserId::new(1));
        assert_eq!(b.user_id, UserId::new(2));

        let found = repo.find_by_email(&Email::parse("B@X.com").unwrap()).await.unwrap();
        assert_eq!(found, Some(b));
        assert_eq!(repo.find_by_id(UserId::new(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_a_unique_violation() {
        let repo = InMemoryUsersRepository::new();
        repo.create(new_user("a", "a@x.com")).await.unwrap();

        assert_eq!(
            repo.create(new_user("other", "a@x.com")).await.unwrap_err(),
            RepositoryError::UniqueViolation("email".into())
        );
        assert_eq!(
            repo.create(new_user("a", "new@x.com")).await.unwrap_err(),
            RepositoryError::UniqueViolation("username".into())
        );
    }

    #[tokio::test]
    async fn upsert_details_keeps_the_detail_id() {
        let repo = InMemoryUsersRepository::new();
        let user = repo.create(new_user("a", "a@x.com")).await.unwrap();
        assert_eq!(repo.find_details_by_user_id(user.user_id).await.unwrap(), None);

        let first = repo.upsert_details(user.user_id, profile("Ada")).await.unwrap();
        let second = repo.upsert_details(user.user_id, profile("Augusta")).await.unwrap();
        assert_eq!(first.detail_id, second.detail_id);

        let stored = repo.find_details_by_user_id(user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Augusta");
    }

    #[tokio::test]
    async fn default_role_is_seeded() {
        let repo = InMemoryMenuRepository::new();
        let role = repo.find_role(DEFAULT_ROLE_ID).await.unwrap().unwrap();
        assert_eq!(role.role_name, "user");
        assert_eq!(repo.find_role(RoleId::new(2)).await.unwrap(), None);

        let repo = repo.with_role(Role::new(RoleId::new(2), "admin"));
        assert!(repo.find_role(RoleId::new(2)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn role_menus_are_scoped_and_ordered() {
        let repo = InMemoryMenuRepository::new().with_role(Role::new(RoleId::new(2), "admin"));
        let a = repo.create(new_menu("A")).await.unwrap();
        let b = repo.create(new_menu("B")).await.unwrap();
        let c = repo.create(new_menu("C")).await.unwrap();

        for menu in [&c, &a] {
            repo.assign_to_role(RoleMenu { role_id: DEFAULT_ROLE_ID, menu_id: menu.menu_id })
                .await
                .unwrap();
        }
        repo.assign_to_role(RoleMenu { role_id: RoleId::new(2), menu_id: b.menu_id })
            .await
            .unwrap();

        let menus = repo.find_by_role(DEFAULT_ROLE_ID).await.unwrap();
        assert_eq!(menus, vec![a, c]);
    }

    #[tokio::test]
    async fn grant_to_missing_menu_is_rejected() {
        let repo = InMemoryMenuRepository::new();
        let err = repo
            .assign_to_role(RoleMenu { role_id: DEFAULT_ROLE_ID, menu_id: MenuId::new(5) })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Backend(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_menus() {
        let repo = InMemoryMenuRepository::new();
        let update = MenuUpdate::parse(Some("N".into()), None, None).unwrap();
        assert_eq!(repo.update(MenuId::new(1), update.clone()).await.unwrap(), None);
        assert!(!repo.delete(MenuId::new(1)).await.unwrap());

        let menu = repo.create(new_menu("A")).await.unwrap();
        let updated = repo.update(menu.menu_id, update).await.unwrap().unwrap();
        assert_eq!(updated.menu_name, "N");
        assert!(repo.delete(menu.menu_id).await.unwrap());
        assert_eq!(repo.find_by_id(menu.menu_id).await.unwrap(), None);
    }
}
