//! Catalog listing state.
//!
//! Holds the shopper's filter inputs and the last loaded listing. Every
//! input change that actually changes a value reloads products, then
//! categories, from the data store.

use std::sync::Arc;

use tracing::instrument;

use online_store_core::{Product, ProductFilter, SortDirection, SortKey};

use crate::store::DataStore;

/// Where the listing is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    Loading,
    Ready {
        products: Vec<Product>,
        categories: Vec<String>,
    },
}

/// Grid or list layout for the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }

    /// Parse a query value; anything unknown is the grid.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("list") => Self::List,
            _ => Self::Grid,
        }
    }
}

/// Catalog view model for one page render.
pub struct CatalogViewModel {
    store: Arc<dyn DataStore>,
    filter: ProductFilter,
    state: CatalogState,
    view_mode: ViewMode,
}

impl CatalogViewModel {
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            filter: ProductFilter::default(),
            state: CatalogState::Loading,
            view_mode: ViewMode::default(),
        }
    }

    /// Load the default listing.
    pub async fn mount(&mut self) {
        self.refresh().await;
    }

    #[must_use]
    pub const fn state(&self) -> &CatalogState {
        &self.state
    }

    #[must_use]
    pub const fn filter(&self) -> &ProductFilter {
        &self.filter
    }

    /// Products of the last successful load; empty while loading.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        match &self.state {
            CatalogState::Ready { products, .. } => products,
            CatalogState::Loading => &[],
        }
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        match &self.state {
            CatalogState::Ready { categories, .. } => categories,
            CatalogState::Loading => &[],
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, CatalogState::Loading)
    }

    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Presentation only; does not reload.
    pub const fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        self.filter.is_active()
    }

    pub async fn set_search(&mut self, search: Option<&str>) {
        let next = ProductFilter::new(
            search,
            self.filter.category.as_deref(),
            self.filter.sort_option(),
        );
        self.apply(next).await;
    }

    pub async fn set_category(&mut self, category: Option<&str>) {
        let next = ProductFilter::new(
            self.filter.search.as_deref(),
            category,
            self.filter.sort_option(),
        );
        self.apply(next).await;
    }

    pub async fn set_sort(&mut self, sort: SortKey) {
        let next = ProductFilter {
            sort,
            ..self.filter.clone()
        };
        self.apply(next).await;
    }

    pub async fn set_direction(&mut self, direction: SortDirection) {
        let next = ProductFilter {
            direction,
            ..self.filter.clone()
        };
        self.apply(next).await;
    }

    /// Replace every input at once. Reloads only if something changed.
    pub async fn apply(&mut self, filter: ProductFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.refresh().await;
    }

    /// Back to the default listing.
    pub async fn clear_filters(&mut self) {
        self.apply(ProductFilter::default()).await;
    }

    #[instrument(skip(self))]
    async fn refresh(&mut self) {
        let previous = std::mem::replace(&mut self.state, CatalogState::Loading);

        let loaded = match self.store.list_products(&self.filter).await {
            Ok(products) => self
                .store
                .list_categories()
                .await
                .map(|categories| (products, categories)),
            Err(e) => Err(e),
        };

        self.state = match loaded {
            Ok((products, categories)) => {
                tracing::debug!(count = products.len(), "Catalog loaded");
                CatalogState::Ready {
                    products,
                    categories,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load catalog");
                match previous {
                    ready @ CatalogState::Ready { .. } => ready,
                    CatalogState::Loading => CatalogState::Ready {
                        products: Vec::new(),
                        categories: Vec::new(),
                    },
                }
            }
        };
    }
}
