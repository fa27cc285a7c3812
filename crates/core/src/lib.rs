//! Online Store Core - Shared domain types.
//!
//! This crate provides the types shared by every online store component:
//! - `storefront` - Public-facing shop (catalog, cart, sign-in)
//! - `integration-tests` - HTTP tests against a running storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. The storefront's data access facade translates these
//! types to and from the hosted backend's wire format.
//!
//! # Modules
//!
//! - [`types`] - Ids, emails, prices, quantities, catalog and cart records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
