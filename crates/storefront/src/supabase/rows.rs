//! Wire rows for `PostgREST` and `GoTrue`.

use serde::{Deserialize, Serialize};

use online_store_core::{CartLine, CartLineId, Identity, Product, ProductId, Quantity, UserId};

// =============================================================================
// PostgREST
// =============================================================================

/// `cart_items` row with the embedded product.
#[derive(Debug, Deserialize)]
pub struct CartItemRow {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Null when the product was deleted after the line was written.
    pub product: Option<Product>,
}

impl CartItemRow {
    pub fn into_line(self) -> Option<CartLine> {
        let product = self.product?;
        Some(CartLine {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            product,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRow {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRow {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

#[derive(Debug, Serialize)]
pub struct QuantityPatch {
    pub quantity: Quantity,
}

// =============================================================================
// GoTrue
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpData,
}

#[derive(Debug, Serialize)]
pub struct SignUpData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Token endpoint response, also returned by sign-up when no email
/// confirmation is required.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserRow,
}

#[derive(Debug, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email.unwrap_or_default(),
            display_name: row
                .user_metadata
                .full_name
                .filter(|name| !name.trim().is_empty()),
        }
    }
}

/// Sign-up returns a session, or a bare user while confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(UserRow),
}
