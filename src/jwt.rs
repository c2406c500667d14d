//! JWT token signing and verification.
//!
//! Dual-token system with independent secrets:
//! - Access tokens: short-lived (15 min), authorize individual API calls
//! - Refresh tokens: long-lived (7 days), only good for minting new access tokens
//!
//! The two kinds are signed with distinct secrets so a leaked access secret
//! cannot forge refresh tokens, and vice versa.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token kind for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived access token (15 minutes)
    Access,
    /// Long-lived refresh token (7 days)
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Token kind
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// A freshly minted token with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signer holding the two independent key pairs.
///
/// Stateless; issuing and verifying are pure functions of key, payload, and
/// clock, so a single instance can be shared across request handlers.
pub struct TokenSigner {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenSigner {
    /// Create a signer from the two secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access: KeyPair::new(access_secret),
            refresh: KeyPair::new(refresh_secret),
        }
    }

    /// Mint a short-lived access token for a user.
    pub fn issue_access(&self, user_id: &str) -> Result<IssuedToken, TokenError> {
        self.issue(user_id, TokenKind::Access, ACCESS_TOKEN_TTL_SECS)
    }

    /// Mint a long-lived refresh token for a user.
    pub fn issue_refresh(&self, user_id: &str) -> Result<IssuedToken, TokenError> {
        self.issue(user_id, TokenKind::Refresh, REFRESH_TOKEN_TTL_SECS)
    }

    fn issue(&self, user_id: &str, kind: TokenKind, ttl: u64) -> Result<IssuedToken, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TimeError)?
            .as_secs();

        let exp = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(|_| TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify a token against the key pair for `kind` and decode its claims.
    ///
    /// The returned error distinguishes expiry, bad signatures, and garbage
    /// input, but callers that build HTTP responses must collapse all of them
    /// into a single unauthorized message.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &validation).map_err(
                |e| match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        TokenError::InvalidSignature
                    }
                    _ => TokenError::Malformed,
                },
            )?;

        if token_data.claims.kind != kind {
            return Err(TokenError::WrongTokenKind);
        }

        Ok(token_data.claims)
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

/// Errors that can occur during token operations.
///
/// The verification failure kinds are internal detail only; they all map to
/// the same external 401 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Error encoding the token
    Encoding,
    /// Embedded expiry has passed
    Expired,
    /// Signature does not match the expected key
    InvalidSignature,
    /// Token cannot be parsed as a JWT carrying our claims
    Malformed,
    /// Valid JWT but the `typ` claim names the other token kind
    WrongTokenKind,
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding => write!(f, "Failed to encode token"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::WrongTokenKind => write!(f, "Wrong token kind"),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}
