//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::routes::page::{PageContext, is_htmx};
use crate::routes::products::{ListingQuery, ListingView, ProductGridTemplate, load_catalog};
use crate::state::AppState;

/// Home page template: hero, search and category filter, product grid.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub listing: ListingView,
}

/// Display the home page.
///
/// Takes the same query as the listing; sort and view stay at their defaults
/// unless given.
#[instrument(skip(state, headers, nonce))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    CspNonce(nonce): CspNonce,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Response {
    let catalog = load_catalog(&state, &query).await;
    let listing = ListingView::new(&catalog, state.config().currency, session.is_signed_in());

    if is_htmx(&headers) {
        return ProductGridTemplate { listing }.into_response();
    }

    let page = PageContext::load(&state, session, nonce, "/").await;
    HomeTemplate { page, listing }.into_response()
}
