//! Integration tests for the online store.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests against the memory backend
//! cargo test -p online-store-integration-tests
//!
//! # Live tests against a Supabase project (reads SUPABASE_* from the environment)
//! cargo test -p online-store-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `storefront_catalog` - Listing, search, filter and sort pages
//! - `storefront_cart` - Cart fragments and the sign-in gate
//! - `storefront_auth` - Registration, login and logout redirects
//! - `supabase_live` - The hosted backend (ignored by default)

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, redirect::Policy};
use tokio::task::JoinHandle;

use online_store_core::{ProductFilter, ProductId};
use online_store_storefront::{
    app,
    config::StorefrontConfig,
    services::auth::MemoryIdentityProvider,
    state::AppState,
    store::{DataStore, MemoryStore},
};

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A storefront running on a random local port against the seeded memory
/// backend. The server stops when this is dropped.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Spawn with the default in-memory configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(StorefrontConfig::in_memory()).await
    }

    /// Spawn with a custom configuration. The backend is always the memory one.
    pub async fn spawn_with(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::seeded());
        let state = AppState::with_backends(
            config,
            store.clone(),
            Arc::new(MemoryIdentityProvider::new()),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            handle,
        }
    }

    /// Absolute URL for a path on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A browser-like client: keeps cookies, does not follow redirects.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register a new account; the client is signed in afterwards.
    pub async fn sign_up(&self, client: &Client, email: &str) -> Response {
        client
            .post(self.url("/auth/register"))
            .form(&[
                ("email", email),
                ("password", TEST_PASSWORD),
                ("password_confirm", TEST_PASSWORD),
                ("full_name", "Test Shopper"),
            ])
            .send()
            .await
            .expect("Failed to post registration")
    }

    /// Id of the seeded product with this name.
    pub async fn product_id(&self, name: &str) -> ProductId {
        self.store
            .list_products(&ProductFilter::default())
            .await
            .expect("Failed to list products")
            .into_iter()
            .find(|product| product.name == name)
            .map(|product| product.id)
            .unwrap_or_else(|| panic!("no seeded product named {name}"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A unique email address per call.
#[must_use]
pub fn unique_email() -> String {
    format!("shopper-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Every `value` of hidden inputs with this `name`, in document order.
#[must_use]
pub fn input_values(html: &str, name: &str) -> Vec<String> {
    let marker = format!("name=\"{name}\" value=\"");
    html.match_indices(&marker)
        .filter_map(|(start, _)| {
            let rest = html.get(start + marker.len()..)?;
            rest.split('"').next().map(str::to_string)
        })
        .collect()
}
