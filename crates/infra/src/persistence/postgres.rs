//! Postgres-backed repositories.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation on email/username) | `23505` | `UniqueViolation(column)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crm_auth::Role;
use crm_core::{DetailId, MenuId, RepositoryError, RoleId, UserId};
use crm_menus::{Menu, MenuRepository, MenuUpdate, NewMenu, RoleMenu};
use crm_users::{Email, NewUser, ProfileUpdate, User, UserDetails, UsersRepository};

/// Map SQLx errors to RepositoryError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let unique = (db_err.code().as_deref() == Some("23505"))
                .then(|| unique_column(db_err.constraint()))
                .flatten();
            if let Some(column) = unique {
                RepositoryError::UniqueViolation(column.to_string())
            } else {
                RepositoryError::backend(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                ))
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            RepositoryError::unavailable(format!("{operation}: {err}"))
        }
        _ => RepositoryError::backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Column behind a unique constraint, from Postgres' default `<table>_<column>_key` naming.
/// Unknown constraints yield `None` and surface as a backend error.
fn unique_column(constraint: Option<&str>) -> Option<&'static str> {
    match constraint {
        Some(name) if name.contains("username") => Some("username"),
        Some(name) if name.contains("email") => Some("email"),
        _ => None,
    }
}

fn decode_error(operation: &str, err: impl core::fmt::Display) -> RepositoryError {
    RepositoryError::backend(format!("failed to decode row in {operation}: {err}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgUsersRepository {
    pool: PgPool,
}

impl PgUsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, RepositoryError> {
    let raw_email: String = row.try_get("email").map_err(|e| decode_error("users", e))?;
    Ok(User {
        user_id: UserId::new(row.try_get("user_id").map_err(|e| decode_error("users", e))?),
        username: row.try_get("username").map_err(|e| decode_error("users", e))?,
        email: Email::parse(&raw_email).map_err(|e| decode_error("users", e))?,
        password_hash: row.try_get("password").map_err(|e| decode_error("users", e))?,
        role_id: RoleId::new(row.try_get("role_id").map_err(|e| decode_error("users", e))?),
    })
}

fn details_from_row(row: &PgRow) -> Result<UserDetails, RepositoryError> {
    let get_err = |e: sqlx::Error| decode_error("user_details", e);
    Ok(UserDetails {
        detail_id: DetailId::new(row.try_get("detail_id").map_err(get_err)?),
        user_id: UserId::new(row.try_get("user_id").map_err(get_err)?),
        first_name: row.try_get("first_name").map_err(get_err)?,
        last_name: row.try_get("last_name").map_err(get_err)?,
        language: row.try_get("language").map_err(get_err)?,
        date_format: row.try_get("date_format").map_err(get_err)?,
        phone_number: row.try_get("phone_number").map_err(get_err)?,
        profile_picture: row.try_get("profile_picture").map_err(get_err)?,
    })
}

const USER_COLUMNS: &str = "user_id, username, email, password, role_id";
const DETAIL_COLUMNS: &str = "detail_id, user_id, first_name, last_name, language, date_format, phone_number, profile_picture";

#[async_trait]
impl UsersRepository for PgUsersRepository {
    #[instrument(skip_all, err)]
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip_all, err)]
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (username, email, password, role_id) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn find_details_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<UserDetails>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DETAIL_COLUMNS} FROM user_details WHERE user_id = $1"
        ))
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_details_by_user_id", e))?;
        row.as_ref().map(details_from_row).transpose()
    }

    #[instrument(skip(self, profile), err)]
    async fn upsert_details(
        &self,
        user_id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserDetails, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO user_details (
                user_id, first_name, last_name, language, date_format, phone_number, profile_picture
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id)
            DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                language = EXCLUDED.language,
                date_format = EXCLUDED.date_format,
                phone_number = EXCLUDED.phone_number,
                profile_picture = EXCLUDED.profile_picture
            RETURNING {DETAIL_COLUMNS}
            "#
        ))
        .bind(user_id.get())
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.language)
        .bind(&profile.date_format)
        .bind(&profile.phone_number)
        .bind(&profile.profile_picture)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_details", e))?;
        details_from_row(&row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Menus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn menu_from_row(row: &PgRow) -> Result<Menu, RepositoryError> {
    let get_err = |e: sqlx::Error| decode_error("menus", e);
    Ok(Menu {
        menu_id: MenuId::new(row.try_get("menu_id").map_err(get_err)?),
        menu_name: row.try_get("menu_name").map_err(get_err)?,
        href: row.try_get("href").map_err(get_err)?,
        icon: row.try_get("icon").map_err(get_err)?,
    })
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    #[instrument(skip(self), err)]
    async fn create(&self, menu: NewMenu) -> Result<Menu, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO menus (menu_name, href, icon) VALUES ($1, $2, $3) \
             RETURNING menu_id, menu_name, href, icon",
        )
        .bind(&menu.menu_name)
        .bind(&menu.href)
        .bind(&menu.icon)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_menu", e))?;
        menu_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, menu_id: MenuId) -> Result<Option<Menu>, RepositoryError> {
        let row = sqlx::query("SELECT menu_id, menu_name, href, icon FROM menus WHERE menu_id = $1")
            .bind(menu_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_menu", e))?;
        row.as_ref().map(menu_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_role(&self, role_id: RoleId) -> Result<Vec<Menu>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT m.menu_id, m.menu_name, m.href, m.icon
            FROM menus m
            JOIN role_menus rm ON rm.menu_id = m.menu_id
            WHERE rm.role_id = $1
            ORDER BY m.menu_id ASC
            "#,
        )
        .bind(role_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_menus_by_role", e))?;
        rows.iter().map(menu_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn update(
        &self,
        menu_id: MenuId,
        update: MenuUpdate,
    ) -> Result<Option<Menu>, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE menus SET
                menu_name = COALESCE($2, menu_name),
                href = COALESCE($3, href),
                icon = COALESCE($4, icon)
            WHERE menu_id = $1
            RETURNING menu_id, menu_name, href, icon
            "#,
        )
        .bind(menu_id.get())
        .bind(update.menu_name)
        .bind(update.href)
        .bind(update.icon)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_menu", e))?;
        row.as_ref().map(menu_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, menu_id: MenuId) -> Result<bool, RepositoryError> {
        // role_menus rows go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM menus WHERE menu_id = $1")
            .bind(menu_id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_menu", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn assign_to_role(&self, grant: RoleMenu) -> Result<RoleMenu, RepositoryError> {
        sqlx::query(
            "INSERT INTO role_menus (role_id, menu_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(grant.role_id.get())
        .bind(grant.menu_id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_menu_to_role", e))?;
        Ok(grant)
    }

    #[instrument(skip(self), err)]
    async fn find_role(&self, role_id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query("SELECT role_id, role_name FROM roles WHERE role_id = $1")
            .bind(role_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        row.map(|row| {
            Ok(Role::new(
                RoleId::new(row.try_get("role_id").map_err(|e| decode_error("roles", e))?),
                row.try_get::<String, _>("role_name")
                    .map_err(|e| decode_error("roles", e))?,
            ))
        })
        .transpose()
    }
}
