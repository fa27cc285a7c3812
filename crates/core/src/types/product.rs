//! Catalog product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A product row as the store returns it.
///
/// Products are read-only here; the catalog is maintained elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in the store currency.
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Units on hand. Zero means out of stock.
    #[serde(default)]
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Unit price tagged with the store currency.
    #[must_use]
    pub const fn unit_price(&self, currency: CurrencyCode) -> Price {
        Price::new(self.price, currency)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Description or an empty string, for templates.
    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_store_row() {
        let json = r#"{
            "id": "6f1c1d5e-8a3b-4c1e-9b8e-2f4a5c6d7e8f",
            "name": "Tea Set",
            "description": null,
            "price": 129.5,
            "image_url": "https://images.example.com/tea.jpg",
            "category": "Kitchen",
            "stock": 0,
            "created_at": "2024-03-01T08:00:00+00:00"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.name, "Tea Set");
        assert_eq!(product.price, Decimal::new(1295, 1));
        assert_eq!(product.description_text(), "");
        assert!(!product.in_stock());
        assert_eq!(product.unit_price(CurrencyCode::CNY).display(), "¥129.50");
    }
}
