//! Session-stored models.

pub mod session;

pub use session::{StoredAuth, keys as session_keys};
