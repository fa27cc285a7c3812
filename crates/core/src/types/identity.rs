//! Signed-in identity and session state.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    /// `full_name` from the provider's user metadata, when set at sign-up.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    /// Name shown in the navigation bar: display name, else email.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Whether the current browser session has a signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    SignedOut,
    SignedIn(Identity),
}

impl SessionState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn(identity) => Some(identity),
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn(_))
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.identity().map(|identity| identity.id)
    }
}

impl From<Option<Identity>> for SessionState {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::SignedOut, Self::SignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity {
            id: UserId::generate(),
            email: "mei@example.com".to_owned(),
            display_name: display_name.map(str::to_owned),
        }
    }

    #[test]
    fn test_label_prefers_display_name() {
        assert_eq!(identity(Some("Mei")).label(), "Mei");
        assert_eq!(identity(Some("  ")).label(), "mei@example.com");
        assert_eq!(identity(None).label(), "mei@example.com");
    }

    #[test]
    fn test_session_state_from_option() {
        assert_eq!(SessionState::from(None), SessionState::SignedOut);
        let state = SessionState::from(Some(identity(None)));
        assert!(state.is_signed_in());
        assert!(state.user_id().is_some());
    }
}
