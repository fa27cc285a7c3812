//! Cart route handlers.
//!
//! Cart mutations are HTMX posts. Each one goes through the cart view model,
//! which refuses to touch the store while signed out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use online_store_core::{CartLine, CartLineId, CurrencyCode, ProductId, SessionState};

use crate::error::{AppError, Result, ValidationError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::routes::page::PageContext;
use crate::state::AppState;
use crate::view_models::{CartError, CartViewModel, SessionHolder};

// =============================================================================
// Display Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: String,
    pub line_total: String,
    pub quantity: u32,
    pub stock: u32,
    pub at_stock_limit: bool,
}

impl CartLineView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            id: line.id.to_string(),
            name: line.product.name.clone(),
            image_url: line.product.image_url.clone(),
            unit_price: line.product.unit_price(currency).display(),
            line_total: line.line_total(currency).display(),
            quantity: line.quantity.get(),
            stock: line.product.stock,
            at_stock_limit: line.at_stock_limit(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub subtotal: String,
    pub total: String,
    pub signed_in: bool,
    pub error: Option<String>,
}

impl CartView {
    fn new(cart: &CartViewModel) -> Self {
        let currency = cart.currency();
        let total = cart.total_price().display();
        Self {
            lines: cart
                .lines()
                .iter()
                .map(|line| CartLineView::new(line, currency))
                .collect(),
            item_count: cart.total_items(),
            // Shipping is free, so the total is the subtotal.
            subtotal: total.clone(),
            total,
            signed_in: cart.session().is_signed_in(),
            error: None,
        }
    }

    fn with_error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

fn parse_line_id(raw: &str) -> Result<CartLineId> {
    raw.parse()
        .map_err(|_| ValidationError::new("line_id", "Unknown cart line").into())
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Badge plus an out-of-band "added" notice (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_added.html")]
pub struct CartAddedTemplate {
    pub badge: String,
    pub kind: &'static str,
    pub message: &'static str,
}

/// Notice shown in `#cart-notice` (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_notice.html")]
pub struct CartNoticeTemplate {
    pub kind: &'static str,
    pub message: String,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub badge: String,
}

// =============================================================================
// Route Handlers
// =============================================================================

fn cart_view_model(state: &AppState, session: SessionState) -> CartViewModel {
    CartViewModel::new(
        state.store(),
        session,
        state.config().cart_add_policy,
        state.config().currency,
    )
}

/// Display the cart page, or a sign-in prompt when signed out.
#[instrument(skip(state, nonce))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    CspNonce(nonce): CspNonce,
) -> Response {
    let mut cart = cart_view_model(&state, session.clone());
    let view = match cart.load().await {
        Ok(()) => CartView::new(&cart),
        Err(_) => {
            CartView::new(&cart).with_error("Your cart could not be loaded. Please try again.")
        }
    };

    let page = PageContext::load(&state, session, nonce, "/cart").await;
    CartShowTemplate { page, cart: view }.into_response()
}

/// Add a product to the cart (HTMX).
///
/// Returns the updated badge with an "added" notice and triggers
/// `cart-updated` for the rest of the page. Failures other than a missing
/// sign-in come back as an error notice retargeted at `#cart-notice`.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let cart = match add_product(&state, session, &form.product_id).await {
        Ok(cart) => cart,
        Err(err @ AppError::Unauthorized(_)) => return Err(err),
        Err(err) => return Ok(add_failed(&err)),
    };

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", form.product_id.as_str())]));

    let holder = SessionHolder::mount(state.store(), cart.session().clone(), None).await;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartAddedTemplate {
            badge: holder.badge(),
            kind: "success",
            message: "Added to cart",
        },
    )
        .into_response())
}

async fn add_product(
    state: &AppState,
    session: SessionState,
    product_id: &str,
) -> Result<CartViewModel> {
    let product: ProductId = product_id
        .parse()
        .map_err(|_| ValidationError::new("product_id", "Unknown product"))?;

    let mut cart = cart_view_model(state, session);
    cart.add_to_cart(product).await?;
    Ok(cart)
}

fn add_failed(err: &AppError) -> Response {
    err.report();
    let message = match err {
        AppError::Validation(_) => err.public_message(),
        _ => "Could not add to cart. Please try again.".to_string(),
    };
    (
        err.status(),
        AppendHeaders([("HX-Retarget", "#cart-notice"), ("HX-Reswap", "innerHTML")]),
        CartNoticeTemplate {
            kind: "error",
            message,
        },
    )
        .into_response()
}

/// Update a line's quantity (HTMX). Zero removes the line.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let line = parse_line_id(&form.line_id)?;
    let mut cart = cart_view_model(&state, session);
    cart.load().await?;

    let view = match cart.set_quantity(line, form.quantity).await {
        Ok(()) => {
            add_breadcrumb("cart", "Updated quantity", Some(&[("line_id", form.line_id.as_str())]));
            CartView::new(&cart)
        }
        Err(CartError::Backend(_)) => {
            CartView::new(&cart).with_error("The quantity could not be updated.")
        }
        Err(e) => return Err(e.into()),
    };

    Ok(items_fragment(view))
}

/// Remove a line from the cart (HTMX).
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let line = parse_line_id(&form.line_id)?;
    let mut cart = cart_view_model(&state, session);
    cart.load().await?;
    cart.remove(line).await?;

    add_breadcrumb("cart", "Removed from cart", Some(&[("line_id", form.line_id.as_str())]));
    Ok(items_fragment(CartView::new(&cart)))
}

/// Empty the cart (HTMX).
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
) -> Result<Response> {
    let mut cart = cart_view_model(&state, session);
    cart.clear().await?;

    add_breadcrumb("cart", "Cleared cart", None);
    Ok(items_fragment(CartView::new(&cart)))
}

/// Cart count badge (HTMX).
#[instrument(skip(state))]
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
) -> impl IntoResponse {
    let holder = SessionHolder::mount(state.store(), session, None).await;
    CartCountTemplate {
        badge: holder.badge(),
    }
}

fn items_fragment(cart: CartView) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart },
    )
        .into_response()
}
