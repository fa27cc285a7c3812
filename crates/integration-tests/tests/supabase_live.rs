//! Live tests against a Supabase project.
//!
//! These tests require:
//! - `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `SUPABASE_SERVICE_KEY` in the
//!   environment (or a `.env` file)
//! - The `products` and `cart_items` tables with at least one product
//!
//! Run with: cargo test -p online-store-integration-tests -- --ignored

use secrecy::SecretString;

use online_store_core::{Email, ProductFilter, SortOption};
use online_store_storefront::{
    config::{BackendConfig, StorefrontConfig},
    services::auth::{AuthError, IdentityProvider},
    store::DataStore,
    supabase::{SupabaseAuth, SupabaseClient, SupabaseStore},
};

fn client() -> SupabaseClient {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");
    match &config.backend {
        BackendConfig::Supabase(supabase) => SupabaseClient::new(supabase),
        BackendConfig::Memory => panic!("STORE_BACKEND must be supabase for live tests"),
    }
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_ping() {
    let store = SupabaseStore::new(client());
    store.ping().await.expect("Supabase unreachable");
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_products_sorted_by_price() {
    let store = SupabaseStore::new(client());
    let filter = ProductFilter::new(None, None, "price-asc".parse::<SortOption>().expect("sort"));

    let products = store
        .list_products(&filter)
        .await
        .expect("Failed to list products");

    assert!(!products.is_empty());
    assert!(products.windows(2).all(|pair| match pair {
        [a, b] => a.price <= b.price,
        _ => true,
    }));
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_search_is_a_subset_of_the_catalog() {
    let store = SupabaseStore::new(client());
    let all = store
        .list_products(&ProductFilter::default())
        .await
        .expect("Failed to list products");
    let Some(first) = all.first() else {
        return;
    };

    let needle: String = first.name.chars().take(3).collect();
    let filter = ProductFilter::new(Some(&needle), None, SortOption::default());
    let found = store
        .list_products(&filter)
        .await
        .expect("Failed to search products");

    assert!(found.iter().any(|p| p.id == first.id));
    assert!(found.iter().all(|p| filter.matches(p)));
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_categories_are_distinct() {
    let store = SupabaseStore::new(client());
    let categories = store
        .list_categories()
        .await
        .expect("Failed to list categories");

    let mut deduped = categories.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), categories.len());
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_wrong_password_is_invalid_credentials() {
    let auth = SupabaseAuth::new(client());
    let email = Email::parse(&format!(
        "nobody-{}@example.com",
        uuid::Uuid::new_v4().simple()
    ))
    .expect("valid email");

    let result = auth
        .sign_in(&email, &SecretString::from("not-the-password"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
#[ignore = "Requires a Supabase project"]
async fn test_invalid_token_has_no_identity() {
    let auth = SupabaseAuth::new(client());
    let identity = auth
        .get_identity(&SecretString::from("not-a-jwt"))
        .await
        .expect("Failed to query user");
    assert!(identity.is_none());
}
