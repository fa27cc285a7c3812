//! Cart state for the signed-in shopper.
//!
//! Mutations go to the data store first and are mirrored locally only after
//! the store accepts them. Totals are computed from the lines on demand.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use online_store_core::{
    Cart, CartLine, CartLineId, CurrencyCode, Price, ProductId, Quantity, QuantityError,
    SessionState, UserId,
};

use crate::store::{BackendError, DataStore};

/// What adding a product that is already in the cart does to its quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddToCartPolicy {
    /// Write quantity 1 whatever the line held before.
    #[default]
    ResetToOne,
    /// Add one to the existing line.
    Increment,
}

/// Unknown `STOREFRONT_CART_ADD_POLICY` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown add-to-cart policy: {0} (expected reset or increment)")]
pub struct AddToCartPolicyError(String);

impl FromStr for AddToCartPolicy {
    type Err = AddToCartPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reset" | "reset_to_one" | "reset-to-one" => Ok(Self::ResetToOne),
            "increment" => Ok(Self::Increment),
            _ => Err(AddToCartPolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for AddToCartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetToOne => f.write_str("reset"),
            Self::Increment => f.write_str("increment"),
        }
    }
}

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No one is signed in.
    #[error("sign in to use the cart")]
    AuthRequired,

    /// The product is not in the catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error(transparent)]
    InvalidQuantity(#[from] QuantityError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Cart view model for one request.
pub struct CartViewModel {
    store: Arc<dyn DataStore>,
    session: SessionState,
    policy: AddToCartPolicy,
    currency: CurrencyCode,
    cart: Cart,
}

impl CartViewModel {
    #[must_use]
    pub fn new(
        store: Arc<dyn DataStore>,
        session: SessionState,
        policy: AddToCartPolicy,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            store,
            session,
            policy,
            currency,
            cart: Cart::default(),
        }
    }

    /// Fetch the signed-in shopper's lines. Signed out leaves the cart empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the lines cannot be fetched; the
    /// current lines are kept.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), CartError> {
        let Some(user) = self.session.user_id() else {
            self.cart.clear();
            return Ok(());
        };

        let lines = self.store.get_cart(user).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to load cart");
        })?;
        self.cart = Cart::new(lines);
        Ok(())
    }

    /// Put a product in the cart, one line per product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` when signed out, without touching
    /// the store. Returns `CartError::UnknownProduct` if the catalog has no
    /// such product, or `CartError::Backend` if the store rejects the write.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&mut self, product: ProductId) -> Result<(), CartError> {
        let user = self.require_user()?;

        let quantity = match self.policy {
            AddToCartPolicy::ResetToOne => Quantity::ONE,
            AddToCartPolicy::Increment => {
                let current = Cart::new(self.store.get_cart(user).await.inspect_err(log_failure)?);
                current
                    .line_for_product(product)
                    .map_or(Quantity::ONE, |line| line.quantity.incremented())
            }
        };

        self.store
            .upsert_cart_line(user, product, quantity)
            .await
            .map_err(|e| match e {
                BackendError::UnknownReference(_) => CartError::UnknownProduct(product),
                e => {
                    log_failure(&e);
                    CartError::Backend(e)
                }
            })?;

        // The store assigns the line id; read it back.
        match self.store.get_cart(user).await {
            Ok(lines) => self.cart = Cart::new(lines),
            Err(e) => tracing::warn!(error = %e, "Added to cart but could not reload it"),
        }
        Ok(())
    }

    /// Set a line's quantity. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` when signed out and
    /// `CartError::InvalidQuantity` above `u32::MAX`. Returns
    /// `CartError::Backend` if the store rejects the update; the local line
    /// keeps its old quantity.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &mut self,
        line: CartLineId,
        quantity: i64,
    ) -> Result<(), CartError> {
        let user = self.require_user()?;
        let Some(quantity) = Quantity::from_signed(quantity)? else {
            return self.remove(line).await;
        };

        self.store
            .update_cart_line_quantity(user, line, quantity)
            .await
            .inspect_err(log_failure)?;
        self.cart.set_quantity(line, quantity);
        Ok(())
    }

    /// Remove one line. Removing a line that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` when signed out, or
    /// `CartError::Backend` if the store rejects the delete.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, line: CartLineId) -> Result<(), CartError> {
        let user = self.require_user()?;
        self.store
            .delete_cart_line(user, line)
            .await
            .inspect_err(log_failure)?;
        self.cart.remove(line);
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::AuthRequired` when signed out, or
    /// `CartError::Backend` if the store rejects the delete.
    #[instrument(skip(self))]
    pub async fn clear(&mut self) -> Result<(), CartError> {
        let user = self.require_user()?;
        self.store.clear_cart(user).await.inspect_err(log_failure)?;
        self.cart.clear();
        Ok(())
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.cart.total_items()
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.cart.total_price(self.currency)
    }

    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    fn require_user(&self) -> Result<UserId, CartError> {
        self.session.user_id().ok_or(CartError::AuthRequired)
    }
}

fn log_failure(err: &BackendError) {
    tracing::error!(error = %err, "Cart operation failed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::{always, eq};
    use online_store_core::{Identity, Product, ProductFilter};
    use rust_decimal::Decimal;

    use super::*;
    use crate::store::{MemoryStore, MockDataStore};

    fn signed_in() -> SessionState {
        SessionState::SignedIn(Identity {
            id: UserId::generate(),
            email: "ana@example.com".to_string(),
            display_name: Some("Ana".to_string()),
        })
    }

    fn product(name: &str, price: i64) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: None,
            price: Decimal::from(price),
            image_url: None,
            category: None,
            stock: 10,
            created_at: Utc::now(),
        }
    }

    async fn seeded_cart(policy: AddToCartPolicy) -> (CartViewModel, Vec<Product>) {
        let store = Arc::new(MemoryStore::seeded());
        let products = store.list_products(&ProductFilter::default()).await.unwrap();
        let cart = CartViewModel::new(store, signed_in(), policy, CurrencyCode::CNY);
        (cart, products)
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_line_at_one() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::ResetToOne).await;

        cart.add_to_cart(products[0].id).await.unwrap();
        cart.add_to_cart(products[0].id).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, Quantity::ONE);
    }

    #[tokio::test]
    async fn test_add_twice_increments_under_increment_policy() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::Increment).await;

        cart.add_to_cart(products[0].id).await.unwrap();
        cart.add_to_cart(products[0].id).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity.get(), 2);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::ResetToOne).await;
        cart.add_to_cart(products[0].id).await.unwrap();
        cart.add_to_cart(products[1].id).await.unwrap();
        let line = cart.lines()[0].id;

        cart.set_quantity(line, 0).await.unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert!(cart.lines().iter().all(|l| l.id != line));
        // The store agrees after a reload.
        cart.load().await.unwrap();
        assert_eq!(cart.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_out_of_range_keeps_line() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::ResetToOne).await;
        cart.add_to_cart(products[0].id).await.unwrap();
        let line = cart.lines()[0].id;

        let err = cart
            .set_quantity(line, i64::from(u32::MAX) + 1)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::InvalidQuantity(QuantityError::TooLarge)
        ));
        assert_eq!(cart.lines().len(), 1);
        cart.load().await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, Quantity::ONE);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let (mut cart, _) = seeded_cart(AddToCartPolicy::ResetToOne).await;
        let missing = ProductId::generate();

        let err = cart.add_to_cart(missing).await.unwrap_err();

        assert!(matches!(err, CartError::UnknownProduct(id) if id == missing));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_and_totals() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::ResetToOne).await;
        cart.add_to_cart(products[0].id).await.unwrap();
        let line = cart.lines()[0].id;

        cart.set_quantity(line, 3).await.unwrap();

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price().amount, products[0].price * Decimal::from(3));
    }

    #[tokio::test]
    async fn test_remove_twice_and_clear() {
        let (mut cart, products) = seeded_cart(AddToCartPolicy::ResetToOne).await;
        cart.add_to_cart(products[0].id).await.unwrap();
        cart.add_to_cart(products[1].id).await.unwrap();
        let line = cart.lines()[0].id;

        cart.remove(line).await.unwrap();
        cart.remove(line).await.unwrap();
        assert_eq!(cart.total_items(), 1);

        cart.clear().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price().amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_signed_out_never_reaches_store() {
        let mut store = MockDataStore::new();
        store.expect_upsert_cart_line().never();
        store.expect_update_cart_line_quantity().never();
        store.expect_delete_cart_line().never();
        store.expect_clear_cart().never();
        store.expect_get_cart().never();

        let mut cart = CartViewModel::new(
            Arc::new(store),
            SessionState::SignedOut,
            AddToCartPolicy::Increment,
            CurrencyCode::CNY,
        );
        let line = CartLineId::generate();

        assert!(matches!(
            cart.add_to_cart(ProductId::generate()).await,
            Err(CartError::AuthRequired)
        ));
        assert!(matches!(
            cart.set_quantity(line, 2).await,
            Err(CartError::AuthRequired)
        ));
        assert!(matches!(
            cart.set_quantity(line, 0).await,
            Err(CartError::AuthRequired)
        ));
        assert!(matches!(
            cart.remove(line).await,
            Err(CartError::AuthRequired)
        ));
        assert!(matches!(cart.clear().await, Err(CartError::AuthRequired)));

        cart.load().await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_local_quantity() {
        let session = signed_in();
        let user = session.user_id().unwrap();
        let mug = product("Mug", 10);
        let line = CartLine {
            id: CartLineId::generate(),
            user_id: user,
            product_id: mug.id,
            quantity: Quantity::new(2).unwrap(),
            product: mug,
        };
        let line_id = line.id;

        let mut store = MockDataStore::new();
        store
            .expect_get_cart()
            .with(eq(user))
            .once()
            .return_once(move |_| Ok(vec![line]));
        store
            .expect_update_cart_line_quantity()
            .with(eq(user), eq(line_id), always())
            .once()
            .return_once(|_, _, _| Err(BackendError::service(500, "boom")));

        let mut cart = CartViewModel::new(
            Arc::new(store),
            session,
            AddToCartPolicy::ResetToOne,
            CurrencyCode::CNY,
        );
        cart.load().await.unwrap();

        let err = cart.set_quantity(line_id, 5).await.unwrap_err();
        assert!(matches!(err, CartError::Backend(_)));
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn test_totals_for_two_lines() {
        let session = signed_in();
        let user = session.user_id().unwrap();
        let a = product("A", 10);
        let b = product("B", 5);
        let lines = vec![
            CartLine {
                id: CartLineId::generate(),
                user_id: user,
                product_id: a.id,
                quantity: Quantity::new(2).unwrap(),
                product: a,
            },
            CartLine {
                id: CartLineId::generate(),
                user_id: user,
                product_id: b.id,
                quantity: Quantity::ONE,
                product: b,
            },
        ];

        let mut store = MockDataStore::new();
        store
            .expect_get_cart()
            .once()
            .return_once(move |_| Ok(lines));

        let mut cart = CartViewModel::new(
            Arc::new(store),
            session,
            AddToCartPolicy::ResetToOne,
            CurrencyCode::CNY,
        );
        cart.load().await.unwrap();

        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.total_price().amount, Decimal::from(25));
        assert_eq!(cart.total_price().display(), "¥25.00");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "reset".parse::<AddToCartPolicy>().unwrap(),
            AddToCartPolicy::ResetToOne
        );
        assert_eq!(
            " Increment ".parse::<AddToCartPolicy>().unwrap(),
            AddToCartPolicy::Increment
        );
        assert!("double".parse::<AddToCartPolicy>().is_err());
    }
}
