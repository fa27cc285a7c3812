//! Services shared by the route handlers.
//!
//! - `auth` - email and password sign-in bound to the browser session
//! - `identity_hub` - per-session broadcast of sign-in and sign-out

pub mod auth;
pub mod identity_hub;
