//! Domain types for the online store.

pub mod cart;
pub mod email;
pub mod filter;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{Cart, CartLine};
pub use email::{Email, EmailError};
pub use filter::{ProductFilter, SortDirection, SortKey, SortOption, SortOptionError};
pub use id::*;
pub use identity::{Identity, SessionState};
pub use price::{CurrencyCode, CurrencyCodeError, Price};
pub use product::Product;
pub use quantity::{Quantity, QuantityError};
