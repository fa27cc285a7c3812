//! `PostgREST` implementation of the data store.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use online_store_core::{CartLine, CartLineId, Product, ProductFilter, ProductId, Quantity, UserId};

use super::rows::{CartItemRow, CategoryRow, NewCartItem, QuantityPatch, QuantityRow};
use super::{SupabaseClient, decode, query};
use crate::store::{BackendError, DataStore};

/// Data store over a Supabase project's tables.
#[derive(Clone)]
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    #[must_use]
    pub const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataStore for SupabaseStore {
    #[instrument(skip(self))]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let request = self
            .client
            .table(Method::GET, "products")?
            .query(&query::products(filter));
        let body = self.client.send_ok(request, "list_products").await?;
        let mut products: Vec<Product> = decode(&body, "list_products")?;
        // `ilike` cannot express a literal `*`; keep plain substring matches only.
        products.retain(|product| filter.matches(product));
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<String>, BackendError> {
        let request = self
            .client
            .table(Method::GET, "products")?
            .query(&query::categories());
        let body = self.client.send_ok(request, "list_categories").await?;
        let rows: Vec<CategoryRow> = decode(&body, "list_categories")?;

        let mut categories: Vec<String> = Vec::new();
        for category in rows.into_iter().filter_map(|row| row.category) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn get_cart(&self, user: UserId) -> Result<Vec<CartLine>, BackendError> {
        let request = self
            .client
            .table(Method::GET, "cart_items")?
            .query(&query::cart(user));
        let body = self.client.send_ok(request, "get_cart").await?;
        let rows: Vec<CartItemRow> = decode(&body, "get_cart")?;

        let total = rows.len();
        let lines: Vec<CartLine> = rows.into_iter().filter_map(CartItemRow::into_line).collect();
        if lines.len() < total {
            tracing::warn!(
                skipped = total - lines.len(),
                "Cart lines reference products that no longer exist"
            );
        }
        Ok(lines)
    }

    #[instrument(skip(self))]
    async fn upsert_cart_line(
        &self,
        user: UserId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .table(Method::POST, "cart_items")?
            .query(&query::cart_upsert())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&NewCartItem {
                user_id: user,
                product_id: product,
                quantity,
            });
        self.client.send_ok(request, "upsert_cart_line").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_cart_line_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let request = self
            .client
            .table(Method::PATCH, "cart_items")?
            .query(&query::cart_line(user, line))
            .header("Prefer", "return=minimal")
            .json(&QuantityPatch { quantity });
        self.client
            .send_ok(request, "update_cart_line_quantity")
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_cart_line(&self, user: UserId, line: CartLineId) -> Result<(), BackendError> {
        let request = self
            .client
            .table(Method::DELETE, "cart_items")?
            .query(&query::cart_line(user, line));
        self.client.send_ok(request, "delete_cart_line").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, user: UserId) -> Result<(), BackendError> {
        let request = self
            .client
            .table(Method::DELETE, "cart_items")?
            .query(&query::cart_owner(user));
        self.client.send_ok(request, "clear_cart").await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn count_cart_items(&self, user: UserId) -> Result<u64, BackendError> {
        let request = self
            .client
            .table(Method::GET, "cart_items")?
            .query(&query::cart_quantities(user));
        let body = self.client.send_ok(request, "count_cart_items").await?;
        let rows: Vec<QuantityRow> = decode(&body, "count_cart_items")?;
        Ok(rows.iter().map(|row| u64::from(row.quantity)).sum())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let request = self
            .client
            .table(Method::GET, "products")?
            .query(&[("select", "id"), ("limit", "1")]);
        self.client.send_ok(request, "ping").await?;
        Ok(())
    }
}
