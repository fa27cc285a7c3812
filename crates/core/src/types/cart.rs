//! Cart lines and cart totals.

use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ProductId, UserId};
use super::price::{CurrencyCode, Price};
use super::product::Product;
use super::quantity::Quantity;

/// One product in a user's cart, joined with the product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: Product,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self, currency: CurrencyCode) -> Price {
        self.product.unit_price(currency).times(self.quantity.get())
    }

    /// Whether one more unit would exceed the stock on hand.
    #[must_use]
    pub const fn at_stock_limit(&self) -> bool {
        self.quantity.get() >= self.product.stock
    }
}

/// A user's cart.
///
/// Totals are derived from the lines every time they are asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of unit price times quantity. Zero for an empty cart.
    #[must_use]
    pub fn total_price(&self, currency: CurrencyCode) -> Price {
        self.lines
            .iter()
            .fold(Price::zero(currency), |total, line| {
                total.plus(line.line_total(currency))
            })
    }

    #[must_use]
    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Set a line's quantity locally. Returns `false` if the line is gone.
    pub fn set_quantity(&mut self, id: CartLineId, quantity: Quantity) -> bool {
        self.lines
            .iter_mut()
            .find(|line| line.id == id)
            .map(|line| line.quantity = quantity)
            .is_some()
    }

    /// Drop a line locally. Removing a missing line is a no-op.
    pub fn remove(&mut self, id: CartLineId) {
        self.lines.retain(|line| line.id != id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
