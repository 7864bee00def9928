//! Medistore storefront client library.
//!
//! Keeps client-side mirrors of the server's cart, orders and catalog in
//! sync with the storefront REST API. The server is the single source of
//! truth: every mutation is forwarded, and a mirror only ever holds a value
//! the server actually returned.
//!
//! - [`api`]: REST client and the [`api::StorefrontApi`] seam
//! - [`store`]: cart, order and catalog slices with loading/error state
//! - [`state`]: the [`state::AppState`] container owned by the binary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
