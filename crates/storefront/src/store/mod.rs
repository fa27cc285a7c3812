//! Data access facade.
//!
//! Every catalog and cart operation the storefront performs goes through
//! [`DataStore`]. Implementations are thin: one backend round trip per call,
//! no retries, no caching, no validation beyond decoding the rows.
//!
//! # Implementations
//!
//! - [`crate::supabase::SupabaseStore`] - hosted `PostgREST` tables
//! - [`MemoryStore`] - in-process tables for local development and tests
//!
//! Cart operations always take the owning user. The hosted store enforces
//! ownership with row-level security for browser clients; the server uses a
//! service key, so implementations filter every cart read and write by owner.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use online_store_core::{CartLine, CartLineId, Product, ProductFilter, ProductId, Quantity, UserId};

/// Errors returned by the data store.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never got a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error status.
    #[error("service error ({status}): {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The response body did not decode into the expected rows.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A write referenced a row that does not exist.
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    /// The backend is not usable (misconfigured or poisoned).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Build a service error from a status and message.
    #[must_use]
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }
}

/// Typed access to the catalog and to users' cart lines.
#[automock]
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Products matching the filter, in the filter's order.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError>;

    /// Distinct non-null categories in first-seen order.
    async fn list_categories(&self) -> Result<Vec<String>, BackendError>;

    /// The user's cart lines joined with their products.
    async fn get_cart(&self, user: UserId) -> Result<Vec<CartLine>, BackendError>;

    /// Insert a line for (user, product) or overwrite its quantity.
    async fn upsert_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError>;

    /// Set a line's quantity. A line that no longer exists is not an error.
    async fn update_cart_line_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError>;

    /// Delete one line. A line that no longer exists is not an error.
    async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> Result<(), BackendError>;

    /// Delete every line the user owns.
    async fn clear_cart(&self, user: UserId) -> Result<(), BackendError>;

    /// Sum of quantities across the user's lines.
    async fn count_cart_items(&self, user: UserId) -> Result<u64, BackendError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), BackendError>;
}
