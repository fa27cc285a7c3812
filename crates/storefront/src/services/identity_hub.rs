//! Identity change notifications.
//!
//! Each browser session gets a [`SessionChannel`] id, stored in its session
//! and kept across sign-in (the session id itself is cycled). Sign-in and
//! sign-out publish the new [`SessionState`] on that channel; every open
//! event stream for the same browser receives it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use online_store_core::SessionState;

/// Buffered notifications per subscriber before it starts lagging.
const HUB_CAPACITY: usize = 64;

/// Per-browser-session channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionChannel(Uuid);

impl SessionChannel {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone)]
struct IdentityChange {
    channel: SessionChannel,
    state: SessionState,
}

/// Broadcast hub for identity changes, shared through `AppState`.
#[derive(Debug, Clone)]
pub struct IdentityHub {
    sender: broadcast::Sender<IdentityChange>,
}

impl Default for IdentityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(HUB_CAPACITY);
        Self { sender }
    }

    /// Notify every subscriber of `channel`. Returns how many were listening.
    pub fn publish(&self, channel: SessionChannel, state: SessionState) -> usize {
        tracing::debug!(%channel, signed_in = state.is_signed_in(), "Publishing identity change");
        // No receivers is not an error: nobody has the page open.
        self.sender
            .send(IdentityChange { channel, state })
            .unwrap_or_default()
    }

    /// Listen for changes on `channel` until the subscription is dropped.
    #[must_use]
    pub fn subscribe(&self, channel: SessionChannel) -> Subscription {
        Subscription {
            channel,
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Number of live subscriptions across all channels.
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription to one session channel.
///
/// Dropping it (or calling [`Subscription::release`]) unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    channel: SessionChannel,
    receiver: Option<broadcast::Receiver<IdentityChange>>,
}

impl Subscription {
    #[must_use]
    pub const fn channel(&self) -> SessionChannel {
        self.channel
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Unsubscribe now. Later calls to [`Subscription::next`] return `None`.
    pub fn release(&mut self) {
        self.receiver = None;
    }

    /// Wait for the next change on this channel.
    ///
    /// Returns `None` once released or when the hub is gone. If this
    /// subscriber fell behind, missed changes are skipped; the next one
    /// carries the current state anyway.
    pub async fn next(&mut self) -> Option<SessionState> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(change) if change.channel == self.channel => return Some(change.state),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "Identity subscriber lagged");
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }
}
