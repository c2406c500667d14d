//! Client-held session state.
//!
//! Tokens live in a [`TokenStore`] under the same well-known keys the web
//! client uses for local storage, so "what does the client have persisted"
//! is a question with one answer. The store is cloneable and shared between
//! the session manager and whoever created it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage key for the access token.
pub const TOKEN_KEY: &str = "token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the persisted locale preference.
pub const LOCALE_KEY: &str = "locale";

/// Why a session was terminated by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The refresh endpoint rejected or never answered
    RefreshFailed,
    /// A refresh was needed but no refresh token was stored
    MissingRefreshToken,
}

/// Cloneable key/value store standing in for browser local storage.
#[derive(Clone, Default)]
pub struct TokenStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("token store poisoned").get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("token store poisoned")
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values.lock().expect("token store poisoned").remove(key);
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
    }

    /// Current refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Store both tokens, as done on login/signup.
    pub fn store_session(&self, access_token: &str, refresh_token: &str) {
        self.set(TOKEN_KEY, access_token);
        self.set(REFRESH_TOKEN_KEY, refresh_token);
    }

    /// Replace just the access token, as done on a successful refresh.
    pub fn store_access_token(&self, access_token: &str) {
        self.set(TOKEN_KEY, access_token);
    }

    /// Drop both tokens. Absence of both means unauthenticated.
    pub fn clear_session(&self) {
        self.remove(TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some() || self.refresh_token().is_some()
    }
}
