//! Infrastructure layer: process configuration and storage adapters.

pub mod config;
pub mod persistence;

pub use config::{AppConfig, ConfigError};
pub use persistence::{
    bootstrap_schema, InMemoryMenuRepository, InMemoryUsersRepository, PgMenuRepository,
    PgUsersRepository,
};
