//! Bearer-token authentication for API routes (the auth gate).
//!
//! Protected handlers take the [`RequireAuth`] extractor, which pulls the
//! access token out of the `Authorization` header, verifies it, and attaches
//! the resolved user id. The gate holds no state of its own; everything it
//! needs lives in the token.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};

use crate::jwt::{TokenKind, TokenSigner};

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User UUID from the token's subject claim
    pub user_id: String,
}

/// Authentication errors returned by the gate.
///
/// Expired, malformed, and badly signed tokens all surface as `TokenFailed`
/// with the same message, so responses cannot be used as an oracle for why
/// verification failed.
#[derive(Debug)]
pub enum AuthError {
    /// No bearer token on the request
    NoToken,
    /// Token present but verification failed
    TokenFailed,
}

impl AuthError {
    fn message(&self) -> &'static str {
        match self {
            Self::NoToken => "Not authorized, no token",
            Self::TokenFailed => "Not authorized, token failed",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::StatusCode;
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response()
    }
}

/// Trait for state types that support bearer authentication.
pub trait HasAuthState {
    fn signer(&self) -> &TokenSigner;
}

/// Extractor for API endpoints that require a valid access token.
///
/// Idempotent and stateless; the same request always resolves to the same
/// identity regardless of what ran before it.
pub struct RequireAuth(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::NoToken)?;

        let claims = state
            .signer()
            .verify(token, TokenKind::Access)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token verification failed");
                AuthError::TokenFailed
            })?;

        Ok(RequireAuth(AuthUser {
            user_id: claims.sub,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_present() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );

        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_value() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

        assert_eq!(bearer_token(&headers), None);
    }
}
