//! Authentication API endpoints.
//!
//! - POST `/register` - Create an account, returns both tokens
//! - POST `/login` - Check credentials, returns both tokens
//! - GET `/profile` - Current user, requires a valid access token
//! - POST `/refresh-token` - Exchange a refresh token for a new access token

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ApiError;
use crate::auth::{HasAuthState, RequireAuth};
use crate::jwt::{TokenKind, TokenSigner};
use crate::store::{CredentialStore, StoreError, UserRecord};

#[derive(Clone)]
pub struct AuthState {
    pub store: CredentialStore,
    pub signer: Arc<TokenSigner>,
}

impl HasAuthState for AuthState {
    fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile))
        .route("/refresh-token", post(refresh_token))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Login/register response: both tokens plus the user, matching what the
/// client stores under its `token` / `refreshToken` keys.
#[derive(Serialize)]
struct SessionResponse {
    token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    user: UserRecord,
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct RefreshResponse {
    token: String,
}

fn issue_session(signer: &TokenSigner, user: UserRecord) -> Result<SessionResponse, ApiError> {
    let access = signer
        .issue_access(&user.id)
        .map_err(|e| ApiError::internal_error("Failed to issue access token", e))?;
    let refresh = signer
        .issue_refresh(&user.id)
        .map_err(|e| ApiError::internal_error("Failed to issue refresh token", e))?;

    Ok(SessionResponse {
        token: access.token,
        refresh_token: refresh.token,
        user,
    })
}

async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("All fields are required"));
    }

    let user = match state.store.create(name, email, &payload.password) {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail) => {
            return Err(ApiError::bad_request("User already exists"));
        }
        Err(e) => return Err(ApiError::internal_error("Failed to create user", e)),
    };

    info!(user_id = %user.id, "Registered new user");

    let session = issue_session(&state.signer, user)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // One message for bad email and bad password; the response must not say
    // which check failed.
    let user = state
        .store
        .verify(payload.email.trim(), &payload.password)
        .map_err(|e| ApiError::internal_error("Credential check failed", e))?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    info!(user_id = %user.id, "User logged in");

    let session = issue_session(&state.signer, user)?;
    Ok((StatusCode::OK, Json(session)))
}

async fn profile(
    State(state): State<AuthState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .get(&auth.user_id)
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok((StatusCode::OK, Json(user)))
}

/// Exchange a valid refresh token for a new access token.
///
/// The refresh token itself is not rotated; it stays valid until its own
/// expiry. No state is written - the new token is self-contained.
async fn refresh_token(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let refresh = payload
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Refresh token is required"))?;

    // Expired, malformed, and badly signed tokens all get the same message.
    let claims = state
        .signer
        .verify(refresh, TokenKind::Refresh)
        .map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            ApiError::unauthorized("Invalid or expired refresh token")
        })?;

    let access = state
        .signer
        .issue_access(&claims.sub)
        .map_err(|e| ApiError::internal_error("Failed to issue access token", e))?;

    Ok((
        StatusCode::OK,
        Json(RefreshResponse {
            token: access.token,
        }),
    ))
}
