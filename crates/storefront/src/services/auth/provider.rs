//! Auth provider seam.

use async_trait::async_trait;
use secrecy::SecretString;

use online_store_core::{Email, Identity};

use super::AuthError;

/// A signed-in session issued by the provider.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The provider signed the new user in right away.
    SignedIn(AuthSession),
    /// The provider sent a confirmation email; no session yet.
    ConfirmationPending,
}

/// Password-based identity provider.
///
/// Session issuance, confirmation emails and token lifetimes belong to the
/// provider; the storefront only relays credentials and keeps the tokens it
/// is handed.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<AuthSession, AuthError>;

    /// Create an account. `display_name` is stored as `full_name`.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<String>,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError>;

    /// The identity behind `access_token`, or `None` if it is no longer valid.
    async fn get_identity(&self, access_token: &SecretString)
    -> Result<Option<Identity>, AuthError>;

    /// Trade a refresh token for a new session.
    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, AuthError>;
}
