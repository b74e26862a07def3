use axum::{
    routing::{get, post},
    Router,
};

pub mod menus;
pub mod system;
pub mod users;

/// Account endpoints that do not need a token.
pub fn public_users_router() -> Router {
    Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .method_not_allowed_fallback(system::method_not_allowed)
}

/// Account endpoints behind the bearer-token middleware.
pub fn protected_users_router() -> Router {
    Router::new()
        .route("/users/info", get(users::info).put(users::update_info))
        .method_not_allowed_fallback(system::method_not_allowed)
}

pub fn system_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .method_not_allowed_fallback(system::method_not_allowed)
}
