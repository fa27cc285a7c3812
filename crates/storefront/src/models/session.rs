//! Session-related types.
//!
//! Types stored in the session for authentication state.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use online_store_core::Identity;

/// Tokens and identity kept in the session after sign-in.
///
/// The tokens are the auth provider's; they are only used to sign out and
/// to re-check the identity, never for data access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    pub identity: Identity,
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: SecretString,
    #[serde(default, serialize_with = "serialize_optional_secret")]
    pub refresh_token: Option<SecretString>,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::ref_option)] // signature required by serialize_with
fn serialize_optional_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the signed-in user's [`super::StoredAuth`].
    pub const AUTH: &str = "auth";

    /// Key for the browser session's identity-change channel.
    pub const CHANNEL: &str = "session_channel";
}
