//! Transport seam between the session manager and the network.
//!
//! Requests are described by [`ApiRequest`], a cloneable value rebuilt into a
//! fresh `http::Request` for every attempt - replays after a token refresh
//! need a new body. The [`Transport`] trait hides what actually carries the
//! request; the in-process implementation drives an `axum::Router` directly,
//! which is also how the integration tests run without a socket.

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode, header};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

/// A cloneable description of one outgoing API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Build the wire request. `bearer` and `locale` are attached here so
    /// every attempt carries whatever the session holds at that moment.
    pub fn build(&self, bearer: Option<&str>, locale: &str) -> Result<Request<Body>, TransportError> {
        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(self.path.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::ACCEPT_LANGUAGE, locale);

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match &self.body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(json).map_err(|e| {
                    TransportError::Request(e.to_string())
                })?)
            }
            None => Body::empty(),
        };

        builder
            .body(body)
            .map_err(|e| TransportError::Request(e.to_string()))
    }
}

/// A settled HTTP exchange: status plus the collected body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Body(e.to_string()))
    }

    /// The `message` field of an error body, if there is one.
    pub fn message(&self) -> Option<String> {
        self.json::<serde_json::Value>()
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }
}

/// Errors from the transport layer. These are not HTTP errors - a 4xx/5xx
/// response is still a successful exchange.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be built
    Request(String),
    /// The request never produced a response
    Connection(String),
    /// The response body could not be collected or decoded
    Body(String),
    /// The call exceeded the configured deadline
    Timeout,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Request(e) => write!(f, "Failed to build request: {}", e),
            TransportError::Connection(e) => write!(f, "Connection failed: {}", e),
            TransportError::Body(e) => write!(f, "Failed to read response body: {}", e),
            TransportError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Something that can carry a request to the server and bring back the
/// response.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<ApiResponse, TransportError>>;
}

/// In-process transport backed by an `axum::Router`.
///
/// Each send drives a clone of the router to completion, so one instance can
/// serve any number of concurrent calls.
#[derive(Clone)]
pub struct RouterTransport {
    router: axum::Router,
}

impl RouterTransport {
    pub fn new(router: axum::Router) -> Self {
        Self { router }
    }
}

impl Transport for RouterTransport {
    fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<ApiResponse, TransportError>> {
        let router = self.router.clone();
        Box::pin(async move {
            let response = router
                .oneshot(request)
                .await
                .map_err(|_| TransportError::Connection("router unavailable".into()))?;

            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;

            Ok(ApiResponse {
                status: parts.status,
                body: bytes,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_attaches_bearer_and_locale() {
        let request = ApiRequest::get("/api/auth/profile");
        let built = request.build(Some("tok-1"), "de").unwrap();

        assert_eq!(built.method(), Method::GET);
        assert_eq!(built.uri().path(), "/api/auth/profile");
        assert_eq!(
            built.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer tok-1"
        );
        assert_eq!(built.headers().get(header::ACCEPT_LANGUAGE).unwrap(), "de");
    }

    #[test]
    fn test_build_without_token_has_no_auth_header() {
        let request = ApiRequest::get("/api/health");
        let built = request.build(None, "en").unwrap();

        assert!(built.headers().get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_build_json_body_sets_content_type() {
        let request = ApiRequest::post("/api/auth/login", serde_json::json!({"email": "a@b.c"}));
        let built = request.build(None, "en").unwrap();

        assert_eq!(
            built.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_response_message_helper() {
        let response = ApiResponse {
            status: StatusCode::UNAUTHORIZED,
            body: Bytes::from_static(b"{\"message\":\"Not authorized, no token\"}"),
        };

        assert_eq!(
            response.message().as_deref(),
            Some("Not authorized, no token")
        );
    }
}
