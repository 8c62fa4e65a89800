//! Authentication and parsing of one inbound Gitee webhook.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::secret::SecretProvider;
use crate::signature;

pub const JSON_CONTENT_TYPE: &str = "application/json";

// Lookup keys; `HeaderMap` matching is case-insensitive but names are stored lowercase.
const CONTENT_TYPE: &str = "content-type";
const GITEE_EVENT: &str = "x-gitee-event";
const GITEE_TIMESTAMP: &str = "x-gitee-timestamp";
const GITEE_TOKEN: &str = "x-gitee-token";

/// An authenticated webhook. Every string field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub event_type: String,
    pub event_id: String,
    pub signature: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Why a request was turned away, as the status and plain-text message sent
/// back to the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: &'static str,
}

impl Rejection {
    const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }

    pub const METHOD_NOT_ALLOWED: Self =
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "405 Method not allowed");
    pub const UNSUPPORTED_CONTENT_TYPE: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "400 Bad Request: Hook only accepts content-type: application/json",
    );
    pub const MISSING_EVENT: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "400 Bad Request: Missing X-Gitee-Event Header",
    );
    pub const MISSING_TIMESTAMP: Self = Self::new(
        StatusCode::BAD_REQUEST,
        "400 Bad Request: Missing X-Gitee-Timestamp Header",
    );
    pub const MISSING_TOKEN: Self =
        Self::new(StatusCode::FORBIDDEN, "403 Forbidden: Missing X-Gitee-Token");
    pub const UNREADABLE_BODY: Self = Self::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "500 Internal Server Error: Failed to read request body",
    );
    pub const INVALID_TOKEN: Self =
        Self::new(StatusCode::FORBIDDEN, "403 Forbidden: Invalid X-Gitee-Token");
    /// A valid webhook that arrived after the in-flight drain began.
    pub const SHUTTING_DOWN: Self = Self::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "503 Service Unavailable: Shutting down",
    );
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status_code = self.status.as_u16();
        match self.status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!(status_code, response = self.message, "Rejected webhook")
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                warn!(status_code, response = self.message, "Rejected webhook")
            }
            _ => debug!(status_code, response = self.message, "Rejected webhook"),
        }
        (self.status, self.message).into_response()
    }
}

/// Validates a webhook request, consuming its body.
///
/// Checks run in order and stop at the first failure: method, content type,
/// event type, event timestamp, token presence, body read, then the HMAC of
/// the body against the secret the provider hands out right now.
pub async fn validate<S>(
    request: Request,
    secret: &S,
    body_limit: usize,
) -> Result<WebhookEvent, Rejection>
where
    S: SecretProvider + ?Sized,
{
    let (parts, body) = request.into_parts();

    if parts.method != Method::POST {
        return Err(Rejection::METHOD_NOT_ALLOWED);
    }

    let content_type = header(&parts.headers, CONTENT_TYPE)
        .filter(|v| *v == JSON_CONTENT_TYPE)
        .ok_or(Rejection::UNSUPPORTED_CONTENT_TYPE)?;
    let event_type = header(&parts.headers, GITEE_EVENT).ok_or(Rejection::MISSING_EVENT)?;
    let event_id = header(&parts.headers, GITEE_TIMESTAMP).ok_or(Rejection::MISSING_TIMESTAMP)?;
    let token = header(&parts.headers, GITEE_TOKEN).ok_or(Rejection::MISSING_TOKEN)?;

    let body = read_body(body, body_limit).await?;

    let verified = secret
        .current_secret()
        .is_some_and(|key| signature::verify(&key, &body, token));
    if !verified {
        return Err(Rejection::INVALID_TOKEN);
    }

    Ok(WebhookEvent {
        event_type: event_type.to_owned(),
        event_id: event_id.to_owned(),
        signature: token.to_owned(),
        content_type: content_type.to_owned(),
        body,
    })
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, Rejection> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        error!(error = %e, "Failed to read webhook body");
        Rejection::UNREADABLE_BODY
    })
}

/// A header value that is present, valid visible ASCII and non-empty.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticSecret;
    use crate::signature::sign;

    const SECRET: &[u8] = b"s3cr3t";
    const BODY: &[u8] = br#"{"hello":"world"}"#;
    const LIMIT: usize = 1024 * 1024;

    /// A complete, correctly signed push webhook; tests knock pieces out.
    fn signed_request() -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri("/gitee-hook")
            .header("Content-Type", "application/json")
            .header("X-Gitee-Event", "Push Hook")
            .header("X-Gitee-Timestamp", "1700000000000")
            .header("X-Gitee-Token", sign(SECRET, BODY))
    }

    async fn run(request: Request) -> Result<WebhookEvent, Rejection> {
        validate(request, &StaticSecret::new(SECRET), LIMIT).await
    }

    #[tokio::test]
    async fn accepts_signed_request() {
        let event = run(signed_request().body(Body::from(BODY)).unwrap())
            .await
            .unwrap();

        assert_eq!(event.event_type, "Push Hook");
        assert_eq!(event.event_id, "1700000000000");
        assert_eq!(event.content_type, "application/json");
        assert_eq!(event.signature, sign(SECRET, BODY));
        assert_eq!(event.body.as_ref(), BODY);
    }

    #[tokio::test]
    async fn rejects_non_post_methods() {
        for method in ["GET", "PUT", "DELETE", "PATCH", "HEAD"] {
            let request = signed_request()
                .method(method)
                .body(Body::from(BODY))
                .unwrap();

            assert_eq!(run(request).await, Err(Rejection::METHOD_NOT_ALLOWED), "{method}");
        }
    }

    #[tokio::test]
    async fn method_is_checked_before_headers() {
        let request = Request::builder()
            .method("GET")
            .uri("/gitee-hook")
            .body(Body::empty())
            .unwrap();

        assert_eq!(run(request).await, Err(Rejection::METHOD_NOT_ALLOWED));
    }

    #[tokio::test]
    async fn rejects_missing_content_type() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request.headers_mut().remove("content-type");

        assert_eq!(run(request).await, Err(Rejection::UNSUPPORTED_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn rejects_other_content_types() {
        for content_type in [
            "application/x-www-form-urlencoded",
            "text/plain",
            "application/json; charset=utf-8",
        ] {
            let mut request = signed_request().body(Body::from(BODY)).unwrap();
            request
                .headers_mut()
                .insert("content-type", content_type.parse().unwrap());

            assert_eq!(
                run(request).await,
                Err(Rejection::UNSUPPORTED_CONTENT_TYPE),
                "{content_type}"
            );
        }
    }

    #[tokio::test]
    async fn rejects_missing_event_type() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request.headers_mut().remove("x-gitee-event");

        assert_eq!(run(request).await, Err(Rejection::MISSING_EVENT));
    }

    #[tokio::test]
    async fn rejects_empty_event_type() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request
            .headers_mut()
            .insert("x-gitee-event", "".parse().unwrap());

        assert_eq!(run(request).await, Err(Rejection::MISSING_EVENT));
    }

    #[tokio::test]
    async fn rejects_missing_timestamp() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request.headers_mut().remove("x-gitee-timestamp");

        assert_eq!(run(request).await, Err(Rejection::MISSING_TIMESTAMP));
    }

    #[tokio::test]
    async fn rejects_missing_token_with_403() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request.headers_mut().remove("x-gitee-token");

        let rejection = run(request).await.unwrap_err();

        assert_eq!(rejection, Rejection::MISSING_TOKEN);
        assert_eq!(rejection.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rejects_tampered_body() {
        let request = signed_request()
            .body(Body::from(&br#"{"hello":"World"}"#[..]))
            .unwrap();

        assert_eq!(run(request).await, Err(Rejection::INVALID_TOKEN));
    }

    #[tokio::test]
    async fn rejects_token_signed_with_another_secret() {
        let mut request = signed_request().body(Body::from(BODY)).unwrap();
        request
            .headers_mut()
            .insert("x-gitee-token", sign(b"other", BODY).parse().unwrap());

        assert_eq!(run(request).await, Err(Rejection::INVALID_TOKEN));
    }

    #[tokio::test]
    async fn missing_secret_looks_like_bad_signature() {
        let request = signed_request().body(Body::from(BODY)).unwrap();

        let result = validate(request, &StaticSecret::new(Vec::new()), LIMIT).await;

        assert_eq!(result, Err(Rejection::INVALID_TOKEN));
    }

    #[tokio::test]
    async fn secret_is_read_at_verification_time() {
        use std::sync::Mutex;

        struct Rotating(Mutex<Vec<u8>>);
        impl SecretProvider for Rotating {
            fn current_secret(&self) -> Option<Vec<u8>> {
                Some(self.0.lock().unwrap().clone())
            }
        }

        let provider = Rotating(Mutex::new(b"before".to_vec()));
        let request = signed_request().body(Body::from(BODY)).unwrap();
        assert_eq!(
            validate(request, &provider, LIMIT).await,
            Err(Rejection::INVALID_TOKEN)
        );

        *provider.0.lock().unwrap() = SECRET.to_vec();
        let request = signed_request().body(Body::from(BODY)).unwrap();
        assert!(validate(request, &provider, LIMIT).await.is_ok());
    }

    #[tokio::test]
    async fn unreadable_body_is_500() {
        let stream = futures_util::stream::once(async {
            Err::<Bytes, std::io::Error>(std::io::Error::other("connection reset"))
        });
        let request = signed_request().body(Body::from_stream(stream)).unwrap();

        let rejection = run(request).await.unwrap_err();

        assert_eq!(rejection, Rejection::UNREADABLE_BODY);
        assert_eq!(rejection.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_body_is_500() {
        let request = signed_request().body(Body::from(BODY)).unwrap();

        let result = validate(request, &StaticSecret::new(SECRET), 4).await;

        assert_eq!(result, Err(Rejection::UNREADABLE_BODY));
    }

    #[tokio::test]
    async fn rejection_renders_plain_text() {
        let response = Rejection::MISSING_TOKEN.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"403 Forbidden: Missing X-Gitee-Token");
    }
}
