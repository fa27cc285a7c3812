//! Session event stream.
//!
//! Each open page listens on `/events/session`. Sign-in and sign-out in any
//! tab of the same browser session push a new event, so the navigation bar
//! and cart badge follow without a reload.
//!
//! Opening the stream re-checks the stored identity with the provider. An
//! expired access token is refreshed; a revoked session is signed out and
//! every open tab is told.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::services::auth::AuthService;
use crate::state::AppState;
use crate::view_models::SessionHolder;

/// Payload of one `session` event.
#[derive(Debug, Serialize)]
pub struct SessionEvent {
    pub signed_in: bool,
    pub label: Option<String>,
    pub badge: String,
}

impl SessionEvent {
    fn from_holder(holder: &SessionHolder) -> Self {
        let identity = holder.state().identity();
        Self {
            signed_in: identity.is_some(),
            label: identity.map(|identity| identity.label().to_string()),
            badge: holder.badge(),
        }
    }

    fn into_event(self) -> Event {
        match Event::default().event("session").json_data(&self) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode session event");
                Event::default().event("session").data(self.badge)
            }
        }
    }
}

/// Stream session changes for this browser session.
///
/// The first event carries the verified current state; later events follow
/// identity changes. The subscription is released when the client
/// disconnects.
#[instrument(skip(state, session))]
pub async fn session_events(State(state): State<AppState>, session: Session) -> Response {
    let auth = AuthService::new(state.identity(), state.hub(), &session);

    let subscribed = async {
        let subscription = auth.subscribe().await?;
        let current = auth.verify().await?;
        Ok::<_, crate::services::auth::AuthError>((subscription, current))
    };

    match subscribed.await {
        Ok((subscription, current)) => {
            let holder = SessionHolder::mount(state.store(), current, Some(subscription)).await;
            Sse::new(stream(holder))
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

fn stream(mut holder: SessionHolder) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(SessionEvent::from_holder(&holder).into_event());

        while holder.next_change().await {
            yield Ok(SessionEvent::from_holder(&holder).into_event());
        }

        holder.release();
    }
}
