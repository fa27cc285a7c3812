//! Authentication service.
//!
//! Binds an [`IdentityProvider`] to the browser session: the signed-in
//! identity and the provider's tokens live in the session, and every
//! sign-in or sign-out is published on the session's identity channel.

mod error;
mod memory;
mod provider;

pub use error::AuthError;
pub use memory::MemoryIdentityProvider;
pub use provider::{AuthSession, IdentityProvider, SignUpOutcome};

use secrecy::SecretString;
use tower_sessions::Session;

use online_store_core::{Email, Identity, SessionState};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{StoredAuth, session_keys};
use crate::services::identity_hub::{IdentityHub, SessionChannel, Subscription};

/// Minimum password length accepted by the hosted provider's default policy.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of [`AuthService::sign_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    /// Signed in immediately.
    SignedIn(Identity),
    /// Check your email to confirm the account.
    ConfirmationPending,
}

/// Authentication service for one browser session.
pub struct AuthService<'a> {
    provider: &'a dyn IdentityProvider,
    hub: &'a IdentityHub,
    session: &'a Session,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        provider: &'a dyn IdentityProvider,
        hub: &'a IdentityHub,
        session: &'a Session,
    ) -> Self {
        Self {
            provider,
            hub,
            session,
        }
    }

    /// The identity stored in this session, without asking the provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn current_identity(&self) -> Result<SessionState, AuthError> {
        Ok(self.stored_auth().await?.map(|auth| auth.identity).into())
    }

    /// Sign in with email and password.
    ///
    /// On success the session id is cycled, the identity is stored, and the
    /// change is published.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the provider rejects them.
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let email = Email::parse(email)?;
        let auth = self.provider.sign_in(&email, password).await?;
        self.establish(auth).await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        display_name: Option<&str>,
    ) -> Result<SignUpResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        match self.provider.sign_up(&email, password, display_name).await? {
            SignUpOutcome::SignedIn(auth) => {
                let identity = self.establish(auth).await?;
                Ok(SignUpResult::SignedIn(identity))
            }
            SignUpOutcome::ConfirmationPending => Ok(SignUpResult::ConfirmationPending),
        }
    }

    /// Sign out of this session.
    ///
    /// The local session is cleared even if the provider cannot be reached.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let stored = self.session.remove::<StoredAuth>(session_keys::AUTH).await?;

        if let Some(stored) = stored {
            if let Err(e) = self.provider.sign_out(&stored.access_token).await {
                tracing::warn!(error = %e, "Provider sign-out failed, local session cleared anyway");
            }
            tracing::info!(user_id = %stored.identity.id, "User signed out");
        }

        clear_sentry_user();
        self.publish(SessionState::SignedOut).await?;
        Ok(())
    }

    /// Re-check the stored identity with the provider.
    ///
    /// An expired access token is refreshed once. A token the provider no
    /// longer accepts signs the session out. Provider outages keep the
    /// stored identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn verify(&self) -> Result<SessionState, AuthError> {
        let Some(stored) = self.stored_auth().await? else {
            return Ok(SessionState::SignedOut);
        };

        match self.provider.get_identity(&stored.access_token).await {
            Ok(Some(identity)) => {
                if identity != stored.identity {
                    self.store(&StoredAuth {
                        identity: identity.clone(),
                        ..stored
                    })
                    .await?;
                }
                return Ok(SessionState::SignedIn(identity));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Could not verify identity, keeping session");
                return Ok(SessionState::SignedIn(stored.identity));
            }
        }

        if let Some(refresh_token) = &stored.refresh_token {
            match self.provider.refresh(refresh_token).await {
                Ok(auth) => {
                    let identity = auth.identity.clone();
                    self.store(&StoredAuth::from(auth)).await?;
                    return Ok(SessionState::SignedIn(identity));
                }
                Err(e) => tracing::info!(error = %e, "Session refresh rejected"),
            }
        }

        self.session.remove::<StoredAuth>(session_keys::AUTH).await?;
        clear_sentry_user();
        self.publish(SessionState::SignedOut).await?;
        Ok(SessionState::SignedOut)
    }

    /// Subscribe to identity changes for this browser session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn subscribe(&self) -> Result<Subscription, AuthError> {
        let channel = self.channel().await?;
        Ok(self.hub.subscribe(channel))
    }

    /// This session's identity channel, created on first use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn channel(&self) -> Result<SessionChannel, AuthError> {
        if let Some(channel) = self.session.get(session_keys::CHANNEL).await? {
            return Ok(channel);
        }
        let channel = SessionChannel::generate();
        self.session.insert(session_keys::CHANNEL, channel).await?;
        Ok(channel)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn establish(&self, auth: AuthSession) -> Result<Identity, AuthError> {
        let identity = auth.identity.clone();

        // New id on privilege change; the channel survives the cycle.
        self.session.cycle_id().await?;
        self.store(&StoredAuth::from(auth)).await?;

        set_sentry_user(&identity.id, Some(&identity.email));
        tracing::info!(user_id = %identity.id, "User signed in");

        self.publish(SessionState::SignedIn(identity.clone())).await?;
        Ok(identity)
    }

    async fn stored_auth(&self) -> Result<Option<StoredAuth>, AuthError> {
        Ok(self.session.get(session_keys::AUTH).await?)
    }

    async fn store(&self, auth: &StoredAuth) -> Result<(), AuthError> {
        Ok(self.session.insert(session_keys::AUTH, auth).await?)
    }

    async fn publish(&self, state: SessionState) -> Result<(), AuthError> {
        let channel = self.channel().await?;
        self.hub.publish(channel, state);
        Ok(())
    }
}

impl From<AuthSession> for StoredAuth {
    fn from(auth: AuthSession) -> Self {
        Self {
            identity: auth.identity,
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
        }
    }
}

/// Validate password meets requirements.
fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    use secrecy::ExposeSecret;

    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore as SessionMemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(SessionMemoryStore::default()), None)
    }

    fn password() -> SecretString {
        SecretString::from("hunter22")
    }

    #[tokio::test]
    async fn test_sign_up_signs_in_and_publishes() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);
        let mut subscription = auth.subscribe().await.unwrap();

        let result = auth
            .sign_up("mia@example.com", &password(), Some("  Mia "))
            .await
            .unwrap();

        let SignUpResult::SignedIn(identity) = result else {
            panic!("memory provider signs in on sign-up");
        };
        assert_eq!(identity.display_name.as_deref(), Some("Mia"));
        assert_eq!(
            auth.current_identity().await.unwrap(),
            SessionState::SignedIn(identity.clone())
        );
        assert_eq!(
            subscription.next().await,
            Some(SessionState::SignedIn(identity))
        );
    }

    #[tokio::test]
    async fn test_short_password_rejected_before_provider() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);

        let err = auth
            .sign_up("mia@example.com", &SecretString::from("123"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        let err = auth
            .sign_in("mia@example.com", &password())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);

        let err = auth.sign_in("not-an-email", &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_sign_out_clears_and_publishes() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);

        auth.sign_up("mia@example.com", &password(), None).await.unwrap();
        let mut subscription = auth.subscribe().await.unwrap();

        auth.sign_out().await.unwrap();

        assert_eq!(auth.current_identity().await.unwrap(), SessionState::SignedOut);
        assert_eq!(subscription.next().await, Some(SessionState::SignedOut));
    }

    #[tokio::test]
    async fn test_channel_survives_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);

        let before = auth.channel().await.unwrap();
        auth.sign_up("mia@example.com", &password(), None).await.unwrap();
        assert_eq!(auth.channel().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_verify_signs_out_revoked_session() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);
        auth.sign_up("mia@example.com", &password(), None).await.unwrap();

        // Revoke both tokens behind the session's back.
        let stored: StoredAuth = session.get(session_keys::AUTH).await.unwrap().unwrap();
        provider.sign_out(&stored.access_token).await.unwrap();

        assert_eq!(auth.verify().await.unwrap(), SessionState::SignedOut);
        assert_eq!(auth.current_identity().await.unwrap(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn test_verify_keeps_valid_session() {
        let provider = MemoryIdentityProvider::new();
        let hub = IdentityHub::new();
        let session = session();
        let auth = AuthService::new(&provider, &hub, &session);
        let SignUpResult::SignedIn(identity) =
            auth.sign_up("mia@example.com", &password(), None).await.unwrap()
        else {
            panic!("memory provider signs in on sign-up");
        };

        assert_eq!(auth.verify().await.unwrap(), SessionState::SignedIn(identity));
    }
}
