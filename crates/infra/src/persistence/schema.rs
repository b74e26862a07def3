use sqlx::PgPool;
use tracing::instrument;

use crm_core::RepositoryError;

use super::postgres::map_sqlx_error;

/// Tables mirror the entity shapes. Role 1 is the default role handed to new
/// registrations, so it is always seeded.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    role_id   BIGSERIAL PRIMARY KEY,
    role_name VARCHAR(50) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS users (
    user_id  BIGSERIAL PRIMARY KEY,
    username VARCHAR(50) NOT NULL UNIQUE,
    email    VARCHAR(100) NOT NULL UNIQUE,
    password VARCHAR(255) NOT NULL,
    role_id  BIGINT NOT NULL REFERENCES roles (role_id)
);

CREATE TABLE IF NOT EXISTS user_details (
    detail_id       BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL UNIQUE REFERENCES users (user_id) ON DELETE CASCADE,
    first_name      VARCHAR(50) NOT NULL,
    last_name       VARCHAR(50) NOT NULL,
    language        VARCHAR(20) NOT NULL,
    date_format     VARCHAR(20) NOT NULL,
    phone_number    VARCHAR(20) NOT NULL,
    profile_picture TEXT
);

CREATE TABLE IF NOT EXISTS menus (
    menu_id   BIGSERIAL PRIMARY KEY,
    menu_name VARCHAR(100) NOT NULL,
    href      VARCHAR(20) NOT NULL,
    icon      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS role_menus (
    role_id BIGINT NOT NULL REFERENCES roles (role_id) ON DELETE CASCADE,
    menu_id BIGINT NOT NULL REFERENCES menus (menu_id) ON DELETE CASCADE,
    PRIMARY KEY (role_id, menu_id)
);

INSERT INTO roles (role_id, role_name) VALUES (1, 'user') ON CONFLICT DO NOTHING;

SELECT setval(
    pg_get_serial_sequence('roles', 'role_id'),
    GREATEST((SELECT MAX(role_id) FROM roles), 1)
);
"#;

/// Create missing tables and seed the default role. Idempotent.
#[instrument(skip_all, err)]
pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("bootstrap_schema", e))?;
    tracing::info!("database schema ready");
    Ok(())
}
