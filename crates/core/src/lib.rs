//! Pagermart Core - Shared types library.
//!
//! This crate provides common types used across all Pagermart components:
//! - `client` - Session, cart, and catalog reconciliation against the shop API
//! - `cli` - Command-line storefront and operator console
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, credentials, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
