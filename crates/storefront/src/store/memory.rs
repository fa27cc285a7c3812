//! In-process data store.
//!
//! Mirrors the hosted tables closely enough to run the storefront without a
//! backend: the same filter semantics, the same one-line-per-(user, product)
//! upsert key, and the same "missing row is fine" behavior for updates and
//! deletes.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use online_store_core::{
    CartLine, CartLineId, Product, ProductFilter, ProductId, Quantity, UserId,
};

use super::{BackendError, DataStore};

/// A stored cart row, without the product join.
#[derive(Debug, Clone)]
struct CartRow {
    id: CartLineId,
    user_id: UserId,
    product_id: ProductId,
    quantity: Quantity,
}

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    cart_items: Vec<CartRow>,
}

/// Data store backed by in-process tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the given catalog.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                products,
                cart_items: Vec::new(),
            }),
        }
    }

    /// A store with a small demo catalog.
    #[must_use]
    pub fn seeded() -> Self {
        Self::with_products(demo_catalog())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, BackendError> {
        self.tables
            .read()
            .map_err(|_| BackendError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, BackendError> {
        self.tables
            .write()
            .map_err(|_| BackendError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    #[instrument(skip(self))]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| filter.compare(a, b));
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<String>, BackendError> {
        let tables = self.read()?;
        let mut categories: Vec<String> = Vec::new();
        for category in tables.products.iter().filter_map(|p| p.category.as_ref()) {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
        }
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn get_cart(&self, user: UserId) -> Result<Vec<CartLine>, BackendError> {
        let tables = self.read()?;
        let lines = tables
            .cart_items
            .iter()
            .filter(|row| row.user_id == user)
            .filter_map(|row| {
                let product = tables.products.iter().find(|p| p.id == row.product_id)?;
                Some(CartLine {
                    id: row.id,
                    user_id: row.user_id,
                    product_id: row.product_id,
                    quantity: row.quantity,
                    product: product.clone(),
                })
            })
            .collect();
        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn upsert_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;

        if !tables.products.iter().any(|p| p.id == product) {
            return Err(BackendError::UnknownReference(format!("product {product}")));
        }

        match tables
            .cart_items
            .iter_mut()
            .find(|row| row.user_id == user && row.product_id == product)
        {
            Some(row) => row.quantity = quantity,
            None => tables.cart_items.push(CartRow {
                id: CartLineId::generate(),
                user_id: user,
                product_id: product,
                quantity,
            }),
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_cart_line_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let mut tables = self.write()?;
        if let Some(row) = tables
            .cart_items
            .iter_mut()
            .find(|row| row.id == line && row.user_id == user)
        {
            row.quantity = quantity;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> Result<(), BackendError> {
        self.write()?
            .cart_items
            .retain(|row| !(row.id == line && row.user_id == user));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, user: UserId) -> Result<(), BackendError> {
        self.write()?.cart_items.retain(|row| row.user_id != user);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_cart_items(&self, user: UserId) -> Result<u64, BackendError> {
        Ok(self
            .read()?
            .cart_items
            .iter()
            .filter(|row| row.user_id == user)
            .map(|row| u64::from(row.quantity.get()))
            .sum())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.read().map(|_| ())
    }
}

// =============================================================================
// Demo Catalog
// =============================================================================

fn demo_catalog() -> Vec<Product> {
    let launch = Utc
        .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let items: [(&str, &str, i64, &str, u32); 8] = [
        ("Wireless Earbuds", "Noise-cancelling earbuds with a 24-hour charging case", 39900, "Electronics", 25),
        ("Mechanical Keyboard", "Hot-swappable switches and a walnut wrist rest", 59900, "Electronics", 8),
        ("Ceramic Pour-Over Set", "Hand-glazed dripper, server and two cups", 18800, "Kitchen", 12),
        ("Cast Iron Skillet", "Pre-seasoned 26 cm skillet for stovetop or oven", 22900, "Kitchen", 0),
        ("Linen Throw Blanket", "Stonewashed linen in sand, 130 x 170 cm", 26900, "Home", 5),
        ("Desk Lamp", "Dimmable LED lamp with a weighted brass base", 34900, "Home", 3),
        ("Trail Running Shoes", "Lightweight shoes with a rock plate and 6 mm drop", 69900, "Outdoors", 10),
        ("Insulated Water Bottle", "750 ml steel bottle that keeps drinks cold for 24 hours", 12900, "Outdoors", 40),
    ];

    items
        .into_iter()
        .zip(0_i64..)
        .map(|((name, description, cents, category, stock), day)| Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: Some(description.to_string()),
            price: Decimal::new(cents, 2),
            image_url: Some(format!(
                "https://picsum.photos/seed/{}/600/600",
                name.to_lowercase().replace(' ', "-")
            )),
            category: Some(category.to_string()),
            stock,
            created_at: launch + Duration::days(day),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use online_store_core::{SortOption, UserId};

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::seeded()
    }

    async fn first_product(store: &MemoryStore) -> Product {
        store
            .list_products(&ProductFilter::default())
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_list_products_applies_every_predicate() {
        let store = store();
        let filter = ProductFilter::new(Some("lamp"), Some("Home"), SortOption::default());

        let products = store.list_products(&filter).await.unwrap();

        assert_eq!(products.len(), 1);
        assert!(products.iter().all(|p| filter.matches(p)));
    }

    #[tokio::test]
    async fn test_list_products_sorted_for_every_option() {
        let store = store();
        for option in SortOption::ALL {
            let filter = ProductFilter::new(None, None, option);
            let products = store.list_products(&filter).await.unwrap();
            assert_eq!(products.len(), 8);
            assert!(
                products
                    .windows(2)
                    .all(|pair| filter.compare(&pair[0], &pair[1]).is_le()),
                "{option} out of order"
            );
        }
    }

    #[tokio::test]
    async fn test_categories_first_seen_order() {
        let categories = store().list_categories().await.unwrap();
        assert_eq!(categories, vec!["Electronics", "Kitchen", "Home", "Outdoors"]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_line_per_product() {
        let store = store();
        let user = UserId::generate();
        let product = first_product(&store).await;

        store.upsert_cart_line(user, product.id, Quantity::ONE).await.unwrap();
        store
            .upsert_cart_line(user, product.id, Quantity::new(3).unwrap())
            .await
            .unwrap();

        let lines = store.get_cart(user).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.get(), 3);
        assert_eq!(lines[0].product, product);
    }

    #[tokio::test]
    async fn test_upsert_unknown_product_fails() {
        let err = store()
            .upsert_cart_line(UserId::generate(), ProductId::generate(), Quantity::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownReference(_)));
    }

    #[tokio::test]
    async fn test_cart_rows_are_scoped_to_owner() {
        let store = store();
        let owner = UserId::generate();
        let other = UserId::generate();
        let product = first_product(&store).await;

        store.upsert_cart_line(owner, product.id, Quantity::ONE).await.unwrap();
        let line = store.get_cart(owner).await.unwrap()[0].id;

        store
            .update_cart_line_quantity(other, line, Quantity::new(9).unwrap())
            .await
            .unwrap();
        store.delete_cart_line(other, line).await.unwrap();
        store.clear_cart(other).await.unwrap();

        assert_eq!(store.count_cart_items(owner).await.unwrap(), 1);
        assert!(store.get_cart(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_line_is_ok() {
        let store = store();
        let user = UserId::generate();
        store.delete_cart_line(user, CartLineId::generate()).await.unwrap();
        store
            .update_cart_line_quantity(user, CartLineId::generate(), Quantity::ONE)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_count_sums_quantities() {
        let store = store();
        let user = UserId::generate();
        let products = store.list_products(&ProductFilter::default()).await.unwrap();

        store
            .upsert_cart_line(user, products[0].id, Quantity::new(2).unwrap())
            .await
            .unwrap();
        store.upsert_cart_line(user, products[1].id, Quantity::ONE).await.unwrap();

        assert_eq!(store.count_cart_items(user).await.unwrap(), 3);
        store.clear_cart(user).await.unwrap();
        assert_eq!(store.count_cart_items(user).await.unwrap(), 0);
    }
}
