//! Tests for registration, login, and the bearer-token auth gate.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_test_app, expired_access_token, get_with_bearer, post_json, register_user,
};
use serde_json::json;

// =============================================================================
// Health Check
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = create_test_app();

    let response = get_with_bearer(&app, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_both_tokens_and_user() {
    let (app, _, _) = create_test_app();

    let response = post_json(
        &app,
        "/api/auth/register",
        json!({
            "name": "New User",
            "email": "newuser@example.com",
            "password": "SecurePass123!",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert!(body["token"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["user"]["email"], "newuser@example.com");
    assert_eq!(body["user"]["name"], "New User");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let (app, _, _) = create_test_app();
    register_user(&app, "existing@example.com").await;

    let response = post_json(
        &app,
        "/api/auth/register",
        json!({
            "name": "Another User",
            "email": "existing@example.com",
            "password": "SecurePass123!",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_register_missing_fields_rejected() {
    let (app, _, _) = create_test_app();

    let response = post_json(
        &app,
        "/api/auth/register",
        json!({ "name": "", "email": "a@b.c", "password": "pw" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "All fields are required");
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let (app, _, _) = create_test_app();
    register_user(&app, "alice@example.com").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "alice@example.com", "password": "SecurePass123!" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_login_unknown_email_rejected() {
    let (app, _, _) = create_test_app();

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "nonexistent@example.com", "password": "SecurePass123!" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_wrong_password_same_message_as_unknown_email() {
    // Bad email and bad password must be indistinguishable from outside.
    let (app, _, _) = create_test_app();
    register_user(&app, "alice@example.com").await;

    let response = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "alice@example.com", "password": "wrongpassword" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid email or password");
}

// =============================================================================
// Auth Gate
// =============================================================================

#[tokio::test]
async fn test_profile_with_valid_token() {
    let (app, _, _) = create_test_app();
    let (access, _, user_id) = register_user(&app, "alice@example.com").await;

    let response = get_with_bearer(&app, "/api/auth/profile", Some(&access)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_profile_without_token() {
    let (app, _, _) = create_test_app();

    let response = get_with_bearer(&app, "/api/auth/profile", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Not authorized, no token");
}

#[tokio::test]
async fn test_profile_with_garbage_token() {
    let (app, _, _) = create_test_app();

    let response = get_with_bearer(&app, "/api/auth/profile", Some("not-a-jwt")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn test_profile_with_expired_token() {
    let (app, _, _) = create_test_app();
    let (_, _, user_id) = register_user(&app, "alice@example.com").await;

    let expired = expired_access_token(&user_id);
    let response = get_with_bearer(&app, "/api/auth/profile", Some(&expired)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Same message as a garbage token: the gate must not reveal which
    // verification step failed.
    let body = body_json(response).await;
    assert_eq!(body["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn test_profile_rejects_refresh_token_as_bearer() {
    let (app, _, _) = create_test_app();
    let (_, refresh, _) = register_user(&app, "alice@example.com").await;

    let response = get_with_bearer(&app, "/api/auth/profile", Some(&refresh)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn test_gate_is_stateless_across_requests() {
    // The same token authenticates repeatedly; no per-request state builds up.
    let (app, _, _) = create_test_app();
    let (access, _, _) = register_user(&app, "alice@example.com").await;

    for _ in 0..3 {
        let response = get_with_bearer(&app, "/api/auth/profile", Some(&access)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
