mod auth;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::jwt::TokenSigner;
use crate::store::CredentialStore;

pub use auth::AuthState;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(store: CredentialStore, signer: Arc<TokenSigner>) -> Router {
    let auth_state = AuthState { store, signer };

    Router::new().nest("/auth", auth::router(auth_state))
}
