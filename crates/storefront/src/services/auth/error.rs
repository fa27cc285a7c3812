//! Authentication error types.

use thiserror::Error;

use crate::store::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] online_store_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email is registered but not yet confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The auth provider failed or could not be reached.
    #[error("auth provider error: {0}")]
    Provider(#[from] BackendError),

    /// Reading or writing the browser session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
