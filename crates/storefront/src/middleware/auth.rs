//! Authentication extractor.
//!
//! Reads the signed-in identity from the session without calling the
//! identity provider. The session event stream re-verifies it with the
//! provider each time a page opens.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use online_store_core::{Identity, SessionState};

use crate::models::{StoredAuth, session_keys};

/// Extractor for the current session state, signed in or not.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalAuth(state): OptionalAuth,
/// ) -> impl IntoResponse {
///     match state.identity() {
///         Some(identity) => format!("Hello, {}!", identity.label()),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalAuth(pub SessionState);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Session>() {
            Some(session) => stored_identity(session).await,
            None => None,
        };

        Ok(Self(identity.into()))
    }
}

async fn stored_identity(session: &Session) -> Option<Identity> {
    session
        .get::<StoredAuth>(session_keys::AUTH)
        .await
        .ok()
        .flatten()
        .map(|auth| auth.identity)
}
