//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: composition root (repositories, hashing, tokens)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: error middleware and error envelopes
//! - `response.rs`: success envelopes

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod response;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };
    let error_handler = errors::ErrorMiddleware::new(services.environment);

    // Bearer token required.
    let protected = routes::protected_users_router().layer(
        axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware),
    );

    Router::new()
        .merge(routes::system_router())
        .merge(routes::public_users_router())
        .merge(protected)
        .nest("/menu", routes::menus::router())
        .fallback(routes::system::fallback)
        .layer(Extension(Arc::new(services)))
        // Error middleware is outermost so it also sees panics and auth rejections.
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    error_handler,
                    errors::error_middleware,
                ))
                .layer(CatchPanicLayer::custom(errors::panic_to_error)),
        )
}
