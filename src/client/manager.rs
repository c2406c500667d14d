//! Session manager: request decoration and single-flight token refresh.
//!
//! Every call goes out with the stored access token attached. When a call
//! comes back 401, the manager renews the token through the refresh endpoint
//! and replays the call, with three guarantees:
//!
//! - at most one refresh request is in flight per manager; concurrent 401s
//!   queue behind it and share its outcome
//! - a call is replayed at most once, so a token that fails twice cannot
//!   loop
//! - a failed refresh rejects every queued call, clears the stored tokens,
//!   and fires the session-end handler exactly once
//!
//! Each manager owns its own state; two managers never share a refresh.

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::session::{LOCALE_KEY, SessionEnd, TokenStore};
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Refresh endpoint path, excluded from 401 recovery by construction: the
/// manager calls it directly, never through `execute`.
pub const REFRESH_TOKEN_PATH: &str = "/api/auth/refresh-token";

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// Default per-call network deadline. Bounds how long a hung refresh can
/// hold the queue before the failure path runs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced to callers of the manager.
///
/// HTTP error statuses are not errors here - a settled 4xx/5xx exchange
/// comes back as a normal [`ApiResponse`] for the caller to inspect.
#[derive(Debug)]
pub enum ClientError {
    /// The request never settled (connection, body, or deadline failure)
    Transport(TransportError),
    /// Token renewal failed; the session has been terminated
    SessionExpired,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "Transport error: {}", e),
            ClientError::SessionExpired => write!(f, "Session expired"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::Transport(e)
    }
}

/// Continuations parked behind an in-flight refresh. Each receives the new
/// access token (to replay its own request) or the termination reason.
type Waiter = oneshot::Sender<Result<String, SessionEnd>>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<Waiter>,
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<Result<String, SessionEnd>>),
}

#[derive(Deserialize)]
struct SessionTokens {
    token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    token: String,
}

/// Owns one client session: transport, token store, and refresh state.
pub struct SessionManager {
    transport: Box<dyn Transport>,
    store: TokenStore,
    locale: String,
    timeout: Duration,
    on_session_end: Option<Box<dyn Fn(SessionEnd) + Send + Sync>>,
    refresh: Mutex<RefreshState>,
}

impl SessionManager {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            store: TokenStore::new(),
            locale: "en".to_string(),
            timeout: DEFAULT_TIMEOUT,
            on_session_end: None,
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    /// Use an existing token store (for example one pre-seeded with tokens).
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = store;
        self
    }

    /// Fallback locale when the store holds no persisted preference.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Per-call network deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Handler invoked when the session is terminated (refresh failure or
    /// missing refresh token). The host decides what "navigate to login"
    /// means; tests just record the call.
    pub fn on_session_end(mut self, handler: impl Fn(SessionEnd) + Send + Sync + 'static) -> Self {
        self.on_session_end = Some(Box::new(handler));
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Execute a call with bearer decoration and automatic token renewal.
    ///
    /// Any settled exchange that is not a 401 passes through untouched,
    /// whatever its status. A 401 triggers one recovery cycle; the replay's
    /// outcome is final even if it is another 401.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let bearer = self.store.access_token();
        let response = self.send(&request, bearer.as_deref()).await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        self.recover_unauthorized(request).await
    }

    /// Log in and store both tokens on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<ApiResponse, ClientError> {
        let request = ApiRequest::post(
            LOGIN_PATH,
            json!({ "email": email, "password": password }),
        );
        self.establish_session(request).await
    }

    /// Register a new account and store both tokens on success.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse, ClientError> {
        let request = ApiRequest::post(
            REGISTER_PATH,
            json!({ "name": name, "email": email, "password": password }),
        );
        self.establish_session(request).await
    }

    /// Voluntary logout: drop the stored tokens.
    pub fn clear_session(&self) {
        self.store.clear_session();
    }

    async fn establish_session(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.send(&request, None).await?;

        if response.status.is_success() {
            let tokens: SessionTokens = response.json()?;
            self.store.store_session(&tokens.token, &tokens.refresh_token);
        }

        Ok(response)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let locale = self.store.get(LOCALE_KEY).unwrap_or_else(|| self.locale.clone());
        let wire = request.build(bearer, &locale)?;

        match tokio::time::timeout(self.timeout, self.transport.send(wire)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClientError::Transport(TransportError::Timeout)),
        }
    }

    /// A call came back 401. Join the in-flight refresh if there is one,
    /// otherwise run it.
    ///
    /// Queue-or-lead is decided in one critical section; the lock is never
    /// held across an await, so no second leader can slip in between the
    /// check and the set.
    async fn recover_unauthorized(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let role = {
            let mut state = self.refresh.lock().expect("refresh state poisoned");
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Role::Waiter(rx)
            } else {
                state.in_flight = true;
                Role::Leader
            }
        };

        match role {
            Role::Waiter(rx) => match rx.await {
                Ok(Ok(token)) => self.send(&request, Some(&token)).await,
                Ok(Err(_)) | Err(_) => Err(ClientError::SessionExpired),
            },
            Role::Leader => self.lead_refresh(request).await,
        }
    }

    async fn lead_refresh(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            // Nothing to renew with; terminate without touching the network.
            self.terminate_session(SessionEnd::MissingRefreshToken);
            return Err(ClientError::SessionExpired);
        };

        debug!("Access token rejected, refreshing");

        match self.call_refresh_endpoint(&refresh_token).await {
            Ok(new_token) => {
                self.store.store_access_token(&new_token);

                // Hand the new token to every queued caller in enqueue order,
                // then replay our own request. Each waiter resends its own
                // request, so completion order across the queue is up to the
                // network.
                let waiters = self.finish_refresh();
                for waiter in waiters {
                    let _ = waiter.send(Ok(new_token.clone()));
                }

                info!("Access token refreshed");
                self.send(&request, Some(&new_token)).await
            }
            Err(e) => {
                debug!(error = %e, "Token refresh failed");
                self.terminate_session(SessionEnd::RefreshFailed);
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Call the refresh endpoint directly (never through `execute`, so a 401
    /// from it cannot start another cycle). Any failure - transport, error
    /// status, or unreadable body - counts as a refresh failure.
    async fn call_refresh_endpoint(&self, refresh_token: &str) -> Result<String, ClientError> {
        let request = ApiRequest::post(
            REFRESH_TOKEN_PATH,
            json!({ "refreshToken": refresh_token }),
        );

        let response = self.send(&request, None).await?;

        if response.status != StatusCode::OK {
            return Err(ClientError::SessionExpired);
        }

        let body: RefreshBody = response.json()?;
        Ok(body.token)
    }

    /// Reset the flag and take the queue in one critical section. A caller
    /// arriving after this starts a fresh cycle instead of waiting on a
    /// refresh that already settled.
    fn finish_refresh(&self) -> Vec<Waiter> {
        let mut state = self.refresh.lock().expect("refresh state poisoned");
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    }

    /// Failure cascade: reject the queue, clear the tokens, and notify the
    /// host once. Runs only in the leader, which is what makes "once" hold.
    fn terminate_session(&self, reason: SessionEnd) {
        let waiters = self.finish_refresh();
        for waiter in waiters {
            let _ = waiter.send(Err(reason));
        }

        self.store.clear_session();
        warn!(?reason, "Session terminated");

        if let Some(handler) = &self.on_session_end {
            handler(reason);
        }
    }
}
