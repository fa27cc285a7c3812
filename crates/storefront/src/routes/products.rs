//! Product listing route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use online_store_core::{CurrencyCode, Product, ProductFilter, SortOption};

use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::routes::page::{PageContext, is_htmx};
use crate::state::AppState;
use crate::view_models::{CatalogViewModel, ViewMode};

// =============================================================================
// Display Types
// =============================================================================

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub in_stock: bool,
    pub stock: u32,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description_text().to_string(),
            price: product.unit_price(currency).display(),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
            in_stock: product.in_stock(),
            stock: product.stock,
        }
    }
}

/// One entry of the sort dropdown.
#[derive(Clone)]
pub struct SortChoice {
    pub value: String,
    pub label: &'static str,
    pub selected: bool,
}

/// The filter inputs as the listing form shows them.
#[derive(Clone, Default)]
pub struct FilterView {
    pub search: String,
    pub category: String,
    pub sort: String,
    pub view: &'static str,
    pub list_view: bool,
    pub active: bool,
}

/// Product grid with everything the listing form needs.
#[derive(Clone)]
pub struct ListingView {
    pub products: Vec<ProductCardView>,
    pub categories: Vec<String>,
    pub sort_choices: Vec<SortChoice>,
    pub filter: FilterView,
    pub signed_in: bool,
}

impl ListingView {
    /// Build the view from a loaded catalog.
    #[must_use]
    pub fn new(catalog: &CatalogViewModel, currency: CurrencyCode, signed_in: bool) -> Self {
        let filter = catalog.filter();
        let selected = filter.sort_option();

        Self {
            products: catalog
                .products()
                .iter()
                .map(|p| ProductCardView::new(p, currency))
                .collect(),
            categories: catalog.categories().to_vec(),
            sort_choices: SortOption::ALL
                .iter()
                .map(|option| SortChoice {
                    value: option.to_string(),
                    label: option.label(),
                    selected: *option == selected,
                })
                .collect(),
            filter: FilterView {
                search: filter.search.clone().unwrap_or_default(),
                category: filter.category.clone().unwrap_or_default(),
                sort: selected.to_string(),
                view: catalog.view_mode().as_str(),
                list_view: catalog.view_mode() == ViewMode::List,
                active: catalog.has_active_filters(),
            },
            signed_in,
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(alias = "search")]
    pub q: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub view: Option<String>,
}

impl ListingQuery {
    /// The filter these parameters ask for. An unknown sort is the default.
    #[must_use]
    pub fn filter(&self) -> ProductFilter {
        let sort = self
            .sort
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(SortOption::default, |s| {
                s.parse().unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "Ignoring sort parameter");
                    SortOption::default()
                })
            });
        ProductFilter::new(self.q.as_deref(), self.category.as_deref(), sort)
    }
}

/// Run the catalog view model for one request, loading exactly once.
pub async fn load_catalog(state: &AppState, query: &ListingQuery) -> CatalogViewModel {
    let mut catalog = CatalogViewModel::new(state.store());
    catalog.set_view_mode(ViewMode::from_query(query.view.as_deref()));

    let filter = query.filter();
    if filter.is_active() {
        catalog.apply(filter).await;
    } else {
        catalog.mount().await;
    }
    catalog
}

// =============================================================================
// Templates
// =============================================================================

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub listing: ListingView,
}

/// Product grid fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub listing: ListingView,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Display the product listing.
///
/// HTMX requests get only the grid.
#[instrument(skip(state, headers, nonce))]
pub async fn index(
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

    let page = PageContext::load(&state, session, nonce, "/products").await;
    ProductsIndexTemplate { page, listing }.into_response()
}
