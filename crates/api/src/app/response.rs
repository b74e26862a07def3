//! Success envelope and the per-request response slot.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The one response a request may produce.
///
/// Once something has been sent, further sends are refused.
#[derive(Debug, Default)]
pub struct ResponseContext {
    response: Option<Response>,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers_sent(&self) -> bool {
        self.response.is_some()
    }

    /// Returns `false`, leaving the first response in place, if one was already sent.
    pub fn send(&mut self, response: Response) -> bool {
        if self.headers_sent() {
            return false;
        }
        self.response = Some(response);
        true
    }

    pub fn into_response(self) -> Option<Response> {
        self.response
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessBody<'a, T> {
    status_code: u16,
    success: bool,
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Write a success envelope into `ctx`. `false` if `ctx` was already written.
pub fn send_success<T: Serialize>(
    ctx: &mut ResponseContext,
    data: &T,
    message: Option<&str>,
    status: StatusCode,
) -> bool {
    if ctx.headers_sent() {
        tracing::warn!("response already sent; dropping success envelope");
        return false;
    }
    let body = SuccessBody {
        status_code: status.as_u16(),
        success: true,
        data,
        message,
    };
    ctx.send((status, Json(body)).into_response())
}

/// Handler return value for successful requests.
#[derive(Debug, Clone)]
pub struct SuccessEnvelope<T> {
    data: T,
    message: Option<&'static str>,
    status: StatusCode,
}

impl<T: Serialize> SuccessEnvelope<T> {
    /// 200 with no message.
    pub fn ok(data: T) -> Self {
        Self {
            data,
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self::ok(data).with_status(StatusCode::CREATED)
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for SuccessEnvelope<T> {
    fn into_response(self) -> Response {
        let mut ctx = ResponseContext::new();
        send_success(&mut ctx, &self.data, self.message, self.status);
        ctx.into_response()
            .unwrap_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn envelope_wraps_data_and_message() {
        let response = SuccessEnvelope::created(json!({ "token": "abc" }))
            .with_message("User registered successfully")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({
                "statusCode": 201,
                "success": true,
                "data": { "token": "abc" },
                "message": "User registered successfully",
            })
        );
    }

    #[tokio::test]
    async fn unit_data_is_null_and_message_is_optional() {
        let body = body_json(SuccessEnvelope::ok(()).into_response()).await;
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["statusCode"], 200);
        assert!(body.get("message").is_none());
    }

    #[test]
    fn only_the_first_send_is_kept() {
        let mut ctx = ResponseContext::new();
        assert!(send_success(&mut ctx, &1, None, StatusCode::OK));
        assert!(!send_success(&mut ctx, &2, None, StatusCode::ACCEPTED));
        assert!(!ctx.send(StatusCode::NOT_FOUND.into_response()));
        assert_eq!(ctx.into_response().unwrap().status(), StatusCode::OK);
    }
}
