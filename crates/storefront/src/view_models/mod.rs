//! View models.
//!
//! Per-request (or per-connection) state holders between the data store and
//! the templates. Each one owns its state exclusively; nothing here is
//! shared between requests.

mod cart;
mod catalog;
mod session;

pub use cart::{AddToCartPolicy, AddToCartPolicyError, CartError, CartViewModel};
pub use catalog::{CatalogState, CatalogViewModel, ViewMode};
pub use session::SessionHolder;
