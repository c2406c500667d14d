//! Client-side session continuity: request decoration, single-flight token
//! refresh, and session termination.

mod manager;
mod session;
mod transport;

pub use manager::{
    ClientError, DEFAULT_TIMEOUT, LOGIN_PATH, REFRESH_TOKEN_PATH, REGISTER_PATH, SessionManager,
};
pub use session::{REFRESH_TOKEN_KEY, SessionEnd, TOKEN_KEY, TokenStore};
pub use transport::{ApiRequest, ApiResponse, RouterTransport, Transport, TransportError};
