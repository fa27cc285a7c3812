//! Data every full page needs: the CSP nonce and the navigation bar.

use axum::http::HeaderMap;

use online_store_core::SessionState;

use crate::state::AppState;
use crate::view_models::SessionHolder;

/// Navigation bar and layout data for `base.html`.
#[derive(Clone)]
pub struct PageContext {
    pub nonce: String,
    /// Display name or email when signed in.
    pub user_label: Option<String>,
    /// Cart badge text; empty hides the badge.
    pub cart_badge: String,
    /// Path of the current page, for highlighting the active link.
    pub current_path: &'static str,
}

impl PageContext {
    /// Mount a session holder once to compute the navigation state.
    pub async fn load(
        state: &AppState,
        session: SessionState,
        nonce: String,
        current_path: &'static str,
    ) -> Self {
        let holder = SessionHolder::mount(state.store(), session, None).await;
        Self {
            nonce,
            user_label: holder
                .state()
                .identity()
                .map(|identity| identity.label().to_string()),
            cart_badge: holder.badge(),
            current_path,
        }
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user_label.is_some()
    }
}

/// Whether the request came from HTMX and wants a fragment.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .is_some_and(|value| value.as_bytes() == b"true")
}
