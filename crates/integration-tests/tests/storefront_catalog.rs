//! Catalog pages against the in-memory backend.

use reqwest::StatusCode;

use online_store_integration_tests::TestServer;

async fn get_text(server: &TestServer, path: &str) -> String {
    let resp = TestServer::client()
        .get(server.url(path))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    resp.text().await.expect("Failed to read response")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let server = TestServer::spawn().await;

    assert_eq!(get_text(&server, "/health").await, "ok");

    let resp = TestServer::client()
        .get(server.url("/health/ready"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_home_shows_catalog_and_categories() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/").await;

    assert!(body.contains("Desk Lamp"));
    assert!(body.contains("Wireless Earbuds"));
    for category in ["Electronics", "Kitchen", "Home", "Outdoors"] {
        assert!(body.contains(category), "missing category {category}");
    }
    assert!(body.contains("8 products"));
}

#[tokio::test]
async fn test_out_of_stock_product_cannot_be_added() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/products?q=skillet").await;

    assert!(body.contains("Cast Iron Skillet"));
    assert!(body.contains("Out of stock"));
    assert!(!body.contains("Add to cart"));
}

#[tokio::test]
async fn test_search_matches_name_and_description() {
    let server = TestServer::spawn().await;

    let body = get_text(&server, "/?q=lamp").await;
    assert!(body.contains("Desk Lamp"));
    assert!(!body.contains("Wireless Earbuds"));

    // "walnut" only appears in the keyboard's description.
    let body = get_text(&server, "/products?q=WALNUT").await;
    assert!(body.contains("Mechanical Keyboard"));
    assert!(body.contains("1 products"));
}

#[tokio::test]
async fn test_search_parameter_alias() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/?search=bottle").await;

    assert!(body.contains("Insulated Water Bottle"));
    assert!(!body.contains("Desk Lamp"));
}

#[tokio::test]
async fn test_category_filter() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/products?category=Kitchen").await;

    assert!(body.contains("Ceramic Pour-Over Set"));
    assert!(body.contains("Cast Iron Skillet"));
    assert!(!body.contains("Trail Running Shoes"));
    assert!(body.contains("Clear filters"));
}

#[tokio::test]
async fn test_no_results_shows_empty_state() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/products?q=submarine").await;

    assert!(body.contains("No products found"));
    assert!(body.contains("Clear filters"));
}

#[tokio::test]
async fn test_sort_by_price_ascending() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/products?sort=price-asc").await;

    let bottle = body.find("Insulated Water Bottle").expect("bottle listed");
    let pour_over = body.find("Ceramic Pour-Over Set").expect("pour-over listed");
    let shoes = body.find("Trail Running Shoes").expect("shoes listed");
    assert!(bottle < pour_over);
    assert!(pour_over < shoes);
}

#[tokio::test]
async fn test_unknown_sort_falls_back_to_newest() {
    let server = TestServer::spawn().await;
    let body = get_text(&server, "/products?sort=rating-desc").await;

    // Newest first: the bottle was added last.
    let bottle = body.find("Insulated Water Bottle").expect("bottle listed");
    let earbuds = body.find("Wireless Earbuds").expect("earbuds listed");
    assert!(bottle < earbuds);
}

#[tokio::test]
async fn test_htmx_request_gets_grid_fragment() {
    let server = TestServer::spawn().await;
    let resp = TestServer::client()
        .get(server.url("/products?view=list"))
        .header("HX-Request", "true")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.expect("Failed to read response");
    assert!(body.trim_start().starts_with("<div id=\"product-grid\">"));
    assert!(body.contains("product-list"));
    assert!(!body.contains("<html"));
}

// ============================================================================
// Headers
// ============================================================================

#[tokio::test]
async fn test_pages_carry_security_headers_and_request_id() {
    let server = TestServer::spawn().await;
    let resp = TestServer::client()
        .get(server.url("/"))
        .send()
        .await
        .expect("Failed to send request");

    let headers = resp.headers();
    let csp = headers
        .get("content-security-policy")
        .and_then(|v| v.to_str().ok())
        .expect("CSP header");
    assert!(csp.contains("'nonce-"));
    assert_eq!(
        headers.get("x-frame-options").and_then(|v| v.to_str().ok()),
        Some("DENY")
    );
    assert!(headers.contains_key("x-request-id"));

    // The page's inline script uses the nonce from the header.
    let nonce = csp
        .split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .expect("nonce value")
        .to_string();
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains(&format!("nonce=\"{nonce}\"")));
}
