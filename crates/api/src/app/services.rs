//! Composition root: repositories, hashing and tokens wired into services.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crm_auth::{BcryptHasher, Hs256Jwt, JwtValidator, PasswordHasher};
use crm_core::Environment;
use crm_infra::{
    bootstrap_schema, AppConfig, InMemoryMenuRepository, InMemoryUsersRepository,
    PgMenuRepository, PgUsersRepository,
};
use crm_menus::{MenuRepository, MenusService};
use crm_users::{UsersRepository, UsersService};

/// Everything the handlers need, shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub users: UsersService,
    pub menus: MenusService,
    pub jwt: Arc<dyn JwtValidator>,
    pub environment: Environment,
}

impl AppServices {
    pub fn new(
        users_repo: Arc<dyn UsersRepository>,
        menu_repo: Arc<dyn MenuRepository>,
        hasher: Arc<dyn PasswordHasher>,
        jwt: Arc<Hs256Jwt>,
        environment: Environment,
    ) -> Self {
        Self {
            users: UsersService::new(users_repo, hasher, jwt.clone()),
            menus: MenusService::new(menu_repo),
            jwt,
            environment,
        }
    }

    /// In-memory stores (dev/test).
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(InMemoryUsersRepository::new()),
            Arc::new(InMemoryMenuRepository::new()),
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            Arc::new(Hs256Jwt::new(&config.jwt_secret, config.jwt_ttl)),
            config.environment,
        )
    }

    /// Postgres stores; creates the schema if it is missing.
    pub async fn postgres(config: &AppConfig, database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        bootstrap_schema(&pool)
            .await
            .context("failed to bootstrap database schema")?;

        Ok(Self::new(
            Arc::new(PgUsersRepository::new(pool.clone())),
            Arc::new(PgMenuRepository::new(pool)),
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            Arc::new(Hs256Jwt::new(&config.jwt_secret, config.jwt_ttl)),
            config.environment,
        ))
    }

    /// Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.database_url {
            Some(url) => {
                tracing::info!("using Postgres stores");
                Self::postgres(config, url).await
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
                Ok(Self::in_memory(config))
            }
        }
    }
}
