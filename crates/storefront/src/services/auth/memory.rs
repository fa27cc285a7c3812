//! In-process identity provider for `STORE_BACKEND=memory`.
//!
//! Accounts live for the life of the process. Passwords are hashed with
//! Argon2id; tokens are random and opaque. Sign-up signs the user in
//! immediately (no confirmation email).

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use online_store_core::{Email, Identity, UserId};

use super::{AuthError, AuthSession, IdentityProvider, SignUpOutcome};
use crate::store::BackendError;

struct Account {
    identity: Identity,
    password_hash: String,
}

#[derive(Default)]
struct Accounts {
    /// Keyed by lowercased email.
    by_email: HashMap<String, Account>,
    /// Access token -> user.
    access: HashMap<String, UserId>,
    /// Refresh token -> user.
    refresh: HashMap<String, UserId>,
}

/// Identity provider backed by an in-process account table.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<Accounts>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Accounts>, AuthError> {
        self.accounts
            .read()
            .map_err(|_| BackendError::Unavailable("identity store lock poisoned".to_string()).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Accounts>, AuthError> {
        self.accounts
            .write()
            .map_err(|_| BackendError::Unavailable("identity store lock poisoned".to_string()).into())
    }

    fn issue_session(accounts: &mut Accounts, identity: Identity) -> AuthSession {
        let access_token = random_token();
        let refresh_token = random_token();
        accounts.access.insert(access_token.clone(), identity.id);
        accounts.refresh.insert(refresh_token.clone(), identity.id);

        AuthSession {
            identity,
            access_token: SecretString::from(access_token),
            refresh_token: Some(SecretString::from(refresh_token)),
        }
    }

    fn identity_of(accounts: &Accounts, user: UserId) -> Option<Identity> {
        accounts
            .by_email
            .values()
            .find(|account| account.identity.id == user)
            .map(|account| account.identity.clone())
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        let key = email.as_str().to_lowercase();

        let (identity, password_hash) = {
            let accounts = self.read()?;
            let account = accounts
                .by_email
                .get(&key)
                .ok_or(AuthError::InvalidCredentials)?;
            (account.identity.clone(), account.password_hash.clone())
        };

        verify_password(password.expose_secret(), &password_hash)?;

        let mut accounts = self.write()?;
        Ok(Self::issue_session(&mut accounts, identity))
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<String>,
    ) -> Result<SignUpOutcome, AuthError> {
        let key = email.as_str().to_lowercase();
        if self.read()?.by_email.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password.expose_secret())?;
        let identity = Identity {
            id: UserId::generate(),
            email: email.as_str().to_string(),
            display_name,
        };

        let mut accounts = self.write()?;
        if accounts.by_email.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }
        accounts.by_email.insert(
            key,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );

        Ok(SignUpOutcome::SignedIn(Self::issue_session(
            &mut accounts,
            identity,
        )))
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let mut accounts = self.write()?;
        if let Some(user) = accounts.access.remove(access_token.expose_secret()) {
            accounts.access.retain(|_, owner| *owner != user);
            accounts.refresh.retain(|_, owner| *owner != user);
        }
        Ok(())
    }

    async fn get_identity(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, AuthError> {
        let accounts = self.read()?;
        Ok(accounts
            .access
            .get(access_token.expose_secret())
            .and_then(|user| Self::identity_of(&accounts, *user)))
    }

    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, AuthError> {
        let mut accounts = self.write()?;
        let user = accounts
            .refresh
            .remove(refresh_token.expose_secret())
            .ok_or(AuthError::InvalidCredentials)?;
        let identity = Self::identity_of(&accounts, user).ok_or(AuthError::InvalidCredentials)?;
        Ok(Self::issue_session(&mut accounts, identity))
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Unavailable(format!("password hashing failed: {e}")).into())
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn password() -> SecretString {
        SecretString::from("correct horse battery")
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let outcome = provider
            .sign_up(&email("wen@example.com"), &password(), Some("Wen".to_string()))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));

        let session = provider
            .sign_in(&email("WEN@example.com"), &password())
            .await
            .unwrap();
        assert_eq!(session.identity.display_name.as_deref(), Some("Wen"));
        assert_eq!(
            provider.get_identity(&session.access_token).await.unwrap(),
            Some(session.identity)
        );
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .sign_up(&email("wen@example.com"), &password(), None)
            .await
            .unwrap();

        let err = provider
            .sign_in(&email("wen@example.com"), &SecretString::from("nope nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .sign_up(&email("wen@example.com"), &password(), None)
            .await
            .unwrap();
        let err = provider
            .sign_up(&email("wen@example.com"), &password(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_tokens() {
        let provider = MemoryIdentityProvider::new();
        let SignUpOutcome::SignedIn(session) = provider
            .sign_up(&email("wen@example.com"), &password(), None)
            .await
            .unwrap()
        else {
            panic!("memory provider signs in on sign-up");
        };

        provider.sign_out(&session.access_token).await.unwrap();

        assert_eq!(provider.get_identity(&session.access_token).await.unwrap(), None);
        let refresh = session.refresh_token.unwrap();
        assert!(provider.refresh(&refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let provider = MemoryIdentityProvider::new();
        let SignUpOutcome::SignedIn(session) = provider
            .sign_up(&email("wen@example.com"), &password(), None)
            .await
            .unwrap()
        else {
            panic!("memory provider signs in on sign-up");
        };
        let refresh = session.refresh_token.unwrap();

        let renewed = provider.refresh(&refresh).await.unwrap();
        assert_eq!(renewed.identity, session.identity);
        assert!(provider.refresh(&refresh).await.is_err());
    }
}
