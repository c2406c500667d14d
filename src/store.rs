//! In-memory credential store.
//!
//! The session layer treats user persistence as an external collaborator; it
//! only needs "create an account", "check a password", and "look up a user".
//! Passwords are argon2-hashed on the way in, so nothing past this module
//! ever sees plaintext.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A stored user account. The password hash stays out of serialized output.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    /// User UUID, the token subject
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Errors from credential operations.
#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    /// An account with this email already exists
    DuplicateEmail,
    /// Password hashing or verification machinery failed
    HashingError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::DuplicateEmail => write!(f, "User already exists"),
            StoreError::HashingError(e) => write!(f, "Password hashing failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Cloneable in-memory credential store keyed by email.
#[derive(Clone, Default)]
pub struct CredentialStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new account, hashing the password. Fails if the email is
    /// already taken.
    pub fn create(&self, name: &str, email: &str, password: &str) -> Result<UserRecord, StoreError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::HashingError(e.to_string()))?
            .to_string();

        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash,
        };

        let mut users = self.users.write().expect("credential store poisoned");
        if users.contains_key(email) {
            return Err(StoreError::DuplicateEmail);
        }
        users.insert(email.to_string(), record.clone());
        Ok(record)
    }

    /// Check an email/password pair. Returns the account on a match, `None`
    /// for an unknown email or a wrong password; callers must not be able to
    /// tell which.
    pub fn verify(&self, email: &str, password: &str) -> Result<Option<UserRecord>, StoreError> {
        let record = {
            let users = self.users.read().expect("credential store poisoned");
            match users.get(email) {
                Some(record) => record.clone(),
                None => return Ok(None),
            }
        };

        let parsed = PasswordHash::new(&record.password_hash)
            .map_err(|e| StoreError::HashingError(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(Some(record)),
            Err(argon2::password_hash::Error::Password) => Ok(None),
            Err(e) => Err(StoreError::HashingError(e.to_string())),
        }
    }

    /// Look up a user by id (the token subject).
    pub fn get(&self, user_id: &str) -> Option<UserRecord> {
        let users = self.users.read().expect("credential store poisoned");
        users.values().find(|u| u.id == user_id).cloned()
    }
}
