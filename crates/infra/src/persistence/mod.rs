//! Repository adapters for the users and menus ports.
//!
//! `in_memory` backs tests and database-less dev runs; `postgres` is the
//! production store.

pub mod in_memory;
pub mod postgres;
pub mod schema;

pub use in_memory::{InMemoryMenuRepository, InMemoryUsersRepository};
pub use postgres::{PgMenuRepository, PgUsersRepository};
pub use schema::bootstrap_schema;
