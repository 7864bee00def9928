//! Medistore storefront REST API client.
//!
//! # Architecture
//!
//! - `reqwest` JSON client over the `{ success, <resource>, message? }` envelope
//! - The server is the source of truth; the client never writes back local state
//! - Catalog entry details are cached in memory via `moka` (configurable TTL)
//! - Authenticated routes short-circuit with [`ApiError::Unauthenticated`]
//!   before any network call when no bearer token is set
//!
//! # Endpoints
//!
//! | Operation | Route | Auth |
//! |---|---|---|
//! | fetch cart | `GET /user/cart` | yes |
//! | add to cart | `POST /user/cart/add` | yes |
//! | update cart item | `PUT /user/cart/update` | yes |
//! | remove cart item | `DELETE /user/cart/remove/{id}` | yes |
//! | clear cart | `DELETE /user/cart/clear` | yes |
//! | create order | `POST /user/orders` | yes |
//! | list orders | `GET /user/orders?page=` | yes |
//! | get order | `GET /user/orders/{id}` | yes |
//! | list catalog | `GET /public/medicines?page=&limit=&search=` | no |
//! | get catalog entry | `GET /public/medicines/{id}` | no |
//! | list reviews | `GET /reviews/medicine/{id}?page=` | no |
//! | add review | `POST /reviews/medicine/{id}` | yes |
//! | login / register | `POST /user/auth/{login,register}` | no |
//! | get / update profile | `GET`/`PUT /user/auth/profile` | yes |
//!
//! # Example
//!
//! ```rust,ignore
//! use medistore_storefront::api::{ApiClient, StorefrontApi};
//!
//! let client = ApiClient::new(&config.api)?;
//! let page = client.get_medicines(&CatalogQuery::search("aspirin")).await?;
//! let cart = client.add_to_cart(&page.items[0].id, Quantity::ONE).await?;
//! ```

mod client;
pub mod types;

use std::future::Future;

pub use client::ApiClient;
pub use types::*;

use medistore_core::{DeliveryAddress, MedicineId, OrderId, Quantity};
use thiserror::Error;

/// Errors that can occur when talking to the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The route needs a session and there is none (or the server rejected it).
    #[error("Not authenticated")]
    Unauthenticated,

    /// Referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server rejected the request (bad quantity, out of stock, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Server error ({status}): {}", message.as_deref().unwrap_or("no details"))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },

    /// The configured base URL cannot have path segments appended.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// The server's own message for this failure, if it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::NotFound(msg) | Self::Validation(msg) => Some(msg),
            Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// The storefront operations the client-side stores depend on.
///
/// [`ApiClient`] is the production implementation; tests substitute an
/// in-memory backend.
pub trait StorefrontApi: Send + Sync {
    /// `GET /user/cart`
    fn get_cart(&self) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `POST /user/cart/add`
    fn add_to_cart(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `PUT /user/cart/update`
    fn update_cart_item(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `DELETE /user/cart/remove/{id}`
    fn remove_from_cart(
        &self,
        medicine_id: &MedicineId,
    ) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `DELETE /user/cart/clear`
    fn clear_cart(&self) -> impl Future<Output = Result<Cart, ApiError>> + Send;

    /// `POST /user/orders`
    fn create_order(
        &self,
        delivery_address: &DeliveryAddress,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// `GET /user/orders?page=`
    fn get_orders(&self, page: u32)
    -> impl Future<Output = Result<Page<Order>, ApiError>> + Send;

    /// `GET /user/orders/{id}`
    fn get_order(&self, id: &OrderId) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// `GET /public/medicines`
    fn get_medicines(
        &self,
        query: &CatalogQuery,
    ) -> impl Future<Output = Result<Page<Medicine>, ApiError>> + Send;

    /// `GET /public/medicines/{id}`
    fn get_medicine(
        &self,
        id: &MedicineId,
    ) -> impl Future<Output = Result<Medicine, ApiError>> + Send;
}
