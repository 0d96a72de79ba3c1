//! Pagermart client - session, cart, and catalog reconciliation.
//!
//! This crate is the headless half of the Pagermart storefront: it keeps a
//! local mirror of the state the shop API owns (identity, cart, favorites,
//! catalog) and reconciles that mirror after every mutation by refetching
//! rather than patching. Presentation layers consume the store surfaces and
//! the single-slot notification channel; no store ever returns an error
//! across that boundary.
//!
//! # Architecture
//!
//! - [`state::Shop`] wires everything together and is the only constructor
//!   consumers need. All collaborators are injected; there are no globals.
//! - [`session::AuthSession`] owns the identity cell. Stores hold read-only
//!   handles, so identity can only change through session transitions.
//! - [`cart::CartStore`] serializes mutations behind one lock and replaces
//!   its lines wholesale from the server after each one.
//! - [`favorites::FavoritesStore`] applies toggles optimistically and rolls
//!   back to a snapshot when the server disagrees.
//! - [`notify::NotificationChannel`] carries every user-facing outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use pagermart_client::{Shop, config::ClientConfig, session::LoginRole};
//!
//! let shop = Shop::new(&ClientConfig::from_env()?)?;
//! shop.session().login("nora", "hunter2", LoginRole::Customer).await;
//! shop.cart().add_item(ItemId::new(1), 2).await;
//! if let Some(note) = shop.notifications().current() {
//!     println!("[{:?}] {}", note.severity, note.message);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod notify;
pub mod ops;
pub mod session;
pub mod state;

pub use api::{ApiClient, ApiError};
pub use notify::{Notification, NotificationChannel, Severity};
pub use session::{Identity, LoginRole};
pub use state::Shop;
