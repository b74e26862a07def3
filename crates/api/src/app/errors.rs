//! Error responses.
//!
//! Handlers and middleware return [`ApiError`]. Its `IntoResponse` impl only
//! stashes the failure on a placeholder response; [`error_middleware`], the
//! outermost layer, hands it to [`ErrorMiddleware::handle`], which writes the
//! single error envelope for the request.

use std::any::Any;
use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{async_trait, Json};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crm_core::{make_error, AppError, Environment, ErrorKind, TypedError};

use crate::app::response::ResponseContext;

pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Handler-facing error; anything convertible into [`AppError`] converts with `?`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

/// Failure waiting for the error middleware.
#[derive(Clone)]
struct PendingError(Arc<AppError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(PendingError(Arc::new(self.0)));
        response
    }
}

/// What the error middleware knows about the request that failed.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestMeta {
    pub fn of(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }

    /// Header list safe to log: credentials are masked.
    fn loggable_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let value = if name == AUTHORIZATION || name == COOKIE {
                    "<redacted>".to_string()
                } else {
                    value.to_str().unwrap_or("<binary>").to_string()
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Wire shape of a failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope<'a> {
    pub status_code: u16,
    pub success: bool,
    pub error_name: ErrorKind,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a JsonValue>,
}

impl<'a> From<&'a TypedError> for ErrorEnvelope<'a> {
    fn from(err: &'a TypedError) -> Self {
        Self {
            status_code: err.status_code(),
            success: false,
            error_name: err.kind(),
            message: err.message(),
            data: err.data(),
        }
    }
}

fn render(err: &TypedError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(ErrorEnvelope::from(err))).into_response();
    if let Ok(value) = HeaderValue::from_str(&err.correlation_id().to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

/// Terminal error handler.
#[derive(Debug, Copy, Clone)]
pub struct ErrorMiddleware {
    environment: Environment,
}

impl ErrorMiddleware {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Write the error envelope for `err` into `ctx`.
    ///
    /// Does nothing but log when `ctx` already holds a response.
    pub fn handle(&self, err: &AppError, meta: &RequestMeta, ctx: &mut ResponseContext) {
        if ctx.headers_sent() {
            tracing::warn!(
                method = %meta.method,
                uri = %meta.uri,
                error = %err,
                "response already sent; dropping error"
            );
            return;
        }

        let typed = match err {
            AppError::Typed(typed) => {
                tracing::info!(
                    correlation_id = %typed.correlation_id(),
                    kind = %typed.kind(),
                    status = typed.status_code(),
                    method = %meta.method,
                    uri = %meta.uri,
                    "request failed"
                );
                typed.clone()
            }
            AppError::Unexpected(cause) => {
                let typed = TypedError::from_unknown(cause, self.environment);
                tracing::error!(
                    correlation_id = %typed.correlation_id(),
                    error = %cause,
                    chain = ?cause,
                    method = %meta.method,
                    uri = %meta.uri,
                    headers = ?meta.loggable_headers(),
                    "unhandled error"
                );
                typed
            }
        };

        ctx.send(render(&typed));
    }
}

/// Outermost layer: renders any failure left on the response by a handler.
pub async fn error_middleware(
    State(errors): State<ErrorMiddleware>,
    req: Request,
    next: Next,
) -> Response {
    let meta = RequestMeta::of(&req);
    let mut response = next.run(req).await;

    let Some(PendingError(err)) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    let mut ctx = ResponseContext::new();
    errors.handle(&err, &meta, &mut ctx);
    ctx.into_response().unwrap_or(response)
}

/// Panic hook for `CatchPanicLayer`: the panic becomes an unexpected failure.
pub fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError(AppError::Unexpected(anyhow::anyhow!("handler panicked: {detail}"))).into_response()
}

/// `Json` extractor whose rejection is a validation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(make_error(
                ErrorKind::Validation,
                Some("Invalid request body".to_string()),
                Some(serde_json::json!({ "reason": rejection.body_text() })),
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_core::{not_found, validation_error, FieldViolation};

    fn meta() -> RequestMeta {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret-token"));
        RequestMeta {
            method: Method::GET,
            uri: Uri::from_static("/users/info"),
            headers,
        }
    }

    async fn body_json(response: Response) -> JsonValue {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn typed_error_renders_its_own_envelope() {
        let err = validation_error(
            Some("User with this email already exists"),
            Some(FieldViolation::new("email", "Email already exists")),
        );
        let correlation_id = err.correlation_id().to_string();

        let mut ctx = ResponseContext::new();
        ErrorMiddleware::new(Environment::Production).handle(&AppError::from(err), &meta(), &mut ctx);

        let response = ctx.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CORRELATION_ID_HEADER], correlation_id.as_str());

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["errorName"], "Validation");
        assert_eq!(body["message"], "User with this email already exists");
        assert_eq!(body["data"]["field"], "email");
    }

    #[tokio::test]
    async fn unknown_error_message_depends_on_environment() {
        let err = AppError::Unexpected(anyhow::anyhow!("connection refused"));

        let mut ctx = ResponseContext::new();
        ErrorMiddleware::new(Environment::Production).handle(&err, &meta(), &mut ctx);
        let prod = ctx.into_response().unwrap();
        assert_eq!(prod.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(prod).await;
        assert_eq!(body["errorName"], "Internal");
        assert_eq!(body["message"], "Internal Server Error");

        let mut ctx = ResponseContext::new();
        ErrorMiddleware::new(Environment::Development).handle(&err, &meta(), &mut ctx);
        let body = body_json(ctx.into_response().unwrap()).await;
        assert_eq!(body["message"], "connection refused");
    }

    #[tokio::test]
    async fn second_handle_writes_nothing() {
        let errors = ErrorMiddleware::new(Environment::Development);
        let mut ctx = ResponseContext::new();

        errors.handle(&AppError::from(not_found(Some("Menu not found"))), &meta(), &mut ctx);
        errors.handle(&AppError::Unexpected(anyhow::anyhow!("late")), &meta(), &mut ctx);

        let response = ctx.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "Menu not found");
    }

    #[test]
    fn credentials_are_not_logged() {
        let headers = meta().loggable_headers();
        assert_eq!(headers, vec![("authorization".to_string(), "<redacted>".to_string())]);
    }

    #[test]
    fn api_error_defers_rendering() {
        let response = ApiError::from(not_found(None)).into_response();
        assert!(response.extensions().get::<PendingError>().is_some());
    }

    #[test]
    fn panics_become_unexpected_errors() {
        let response = panic_to_error(Box::new("boom"));
        let pending = response.extensions().get::<PendingError>().unwrap();
        assert!(matches!(*pending.0, AppError::Unexpected(_)));
        assert!(pending.0.to_string().contains("boom"));
    }
}
