//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Security headers, including the per-request CSP nonce
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Rate limiting on auth and cart posts (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::OptionalAuth;
pub use rate_limit::{auth_rate_limiter, cart_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{CspNonce, security_headers_middleware};
pub use session::create_session_layer;
