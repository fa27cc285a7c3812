//! Who is signed in, and the cart badge that goes with it.

use std::sync::Arc;

use online_store_core::SessionState;

use crate::services::identity_hub::Subscription;
use crate::store::DataStore;

/// Holds the session state for one open page and keeps the badge current.
///
/// The identity subscription is released when the holder is dropped.
pub struct SessionHolder {
    store: Arc<dyn DataStore>,
    state: SessionState,
    cart_count: u64,
    subscription: Option<Subscription>,
}

impl SessionHolder {
    /// Start from the current state and compute the badge once.
    pub async fn mount(
        store: Arc<dyn DataStore>,
        state: SessionState,
        subscription: Option<Subscription>,
    ) -> Self {
        let mut holder = Self {
            store,
            state: SessionState::SignedOut,
            cart_count: 0,
            subscription,
        };
        holder.apply(state).await;
        holder
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Cart item count for the navigation badge.
    #[must_use]
    pub const fn cart_count(&self) -> u64 {
        self.cart_count
    }

    /// Badge text; empty when there is nothing to show.
    #[must_use]
    pub fn badge(&self) -> String {
        match self.cart_count {
            0 => String::new(),
            n if n > 99 => "99+".to_string(),
            n => n.to_string(),
        }
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Replace the state and recompute the badge.
    ///
    /// A failed count keeps the previous badge.
    pub async fn apply(&mut self, state: SessionState) {
        self.cart_count = match state.user_id() {
            Some(user) => match self.store.count_cart_items(user).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to count cart items");
                    self.cart_count
                }
            },
            None => 0,
        };
        self.state = state;
    }

    /// Wait for the next identity change and apply it.
    ///
    /// Returns `false` once unsubscribed or the hub has gone away.
    pub async fn next_change(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(state) => {
                self.apply(state).await;
                true
            }
            None => false,
        }
    }

    /// Stop listening for identity changes.
    pub fn release(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}
