#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use sessiongate::jwt::{Claims, TokenKind, TokenSigner};
use sessiongate::store::CredentialStore;
use sessiongate::{ServerConfig, create_app};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"access-secret-for-integration-tests";
pub const REFRESH_SECRET: &[u8] = b"refresh-secret-for-integration-tests";

/// Create a test app and return (app, store, signer).
pub fn create_test_app() -> (Router, CredentialStore, TokenSigner) {
    let store = CredentialStore::new();
    let config = ServerConfig {
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        store: store.clone(),
    };
    (
        create_app(&config),
        store,
        TokenSigner::new(ACCESS_SECRET, REFRESH_SECRET),
    )
}

/// POST a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// GET with an optional bearer token and return the response.
pub async fn get_with_bearer(
    app: &Router,
    path: &str,
    bearer: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user through the API, returning (access_token, refresh_token, user_id).
pub async fn register_user(app: &Router, email: &str) -> (String, String, String) {
    let response = post_json(
        app,
        "/api/auth/register",
        serde_json::json!({
            "name": "Test User",
            "email": email,
            "password": "SecurePass123!",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

fn encode_expired(user_id: &str, kind: TokenKind, secret: &[u8]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        iat: now - 120,
        exp: now - 60,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret),
    )
    .unwrap()
}

/// Correctly signed access token whose expiry has already passed.
pub fn expired_access_token(user_id: &str) -> String {
    encode_expired(user_id, TokenKind::Access, ACCESS_SECRET)
}

/// Correctly signed refresh token whose expiry has already passed.
pub fn expired_refresh_token(user_id: &str) -> String {
    encode_expired(user_id, TokenKind::Refresh, REFRESH_SECRET)
}
