//! Storefront REST API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP and parses the `{ success, <resource>, message? }`
//! envelope in two passes: status fields first, then the resource body.
//! Catalog entry details are cached using `moka`.

mod cache;
mod conversions;
mod wire;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::field::Empty;
use tracing::{Span, debug, instrument};
use url::Url;
use uuid::Uuid;

use medistore_core::{DeliveryAddress, Email, MedicineId, OrderId, Quantity};

use crate::api::types::{
    Cart, CatalogQuery, Medicine, NewReview, Order, Page, ProfileUpdate, Registration, Review,
    UserProfile,
};
use crate::api::{ApiError, StorefrontApi};
use crate::config::ApiConfig;

use cache::CatalogCache;
use conversions::{
    convert_cart, convert_medicine, convert_medicine_page, convert_order, convert_order_page,
    convert_review, convert_review_page, convert_user,
};
use wire::{
    AuthBody, CartBody, CartLineRequest, CreateOrderRequest, LoginRequest, MedicineBody,
    MedicinesBody, OrderBody, OrdersBody, ProfileBody, RegisterRequest, ReviewBody,
    ReviewRequest, ReviewsBody, Status, UpdateProfileRequest,
};

/// Maximum characters of a response body included in error logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Medistore storefront API.
///
/// Cloning is cheap; clones share the HTTP connection pool, the bearer token
/// and the catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    cache: Option<CatalogCache>,
}

/// Whether a route needs the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Required,
    Public,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built, or
    /// `ApiError::InvalidBaseUrl` if the base URL cannot take path segments.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: RwLock::new(config.token.clone()),
                cache: CatalogCache::with_ttl(config.catalog_cache_ttl),
            }),
        })
    }

    /// Replace the bearer token used for authenticated routes.
    pub async fn set_token(&self, token: SecretString) {
        *self.inner.token.write().await = Some(token);
    }

    /// Forget the bearer token. Authenticated routes fail locally afterwards.
    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Whether a bearer token is currently set.
    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    /// The current bearer token, so a caller can persist the session.
    pub async fn token(&self) -> Option<SecretString> {
        self.inner.token.read().await.clone()
    }

    /// Send a request and decode the envelope into `T`.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let token = match auth {
            Auth::Required => Some(
                self.inner
                    .token
                    .read()
                    .await
                    .as_ref()
                    .map(|t| t.expose_secret().to_string())
                    .ok_or(ApiError::Unauthenticated)?,
            ),
            Auth::Public => None,
        };

        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());
        debug!(%method, url = %url, %request_id, "Sending API request");

        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("x-request-id", &request_id);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                %request_id,
                body = %truncate_for_log(&response_text),
                "Storefront API returned non-success status"
            );
        }

        decode_envelope(status, &response_text).inspect_err(|e| {
            if matches!(e, ApiError::Parse(_)) {
                tracing::error!(
                    error = %e,
                    %request_id,
                    body = %truncate_for_log(&response_text),
                    "Failed to parse storefront API response"
                );
            }
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        build_url(&self.inner.base_url, segments, &[])
    }

    // =========================================================================
    // Account Methods
    // =========================================================================

    /// Sign in and keep the returned token for authenticated routes.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` for bad credentials, or an error if
    /// the API request fails.
    #[instrument(skip(self, password), fields(email = %email, request_id = Empty))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<UserProfile>, ApiError> {
        let body = serde_json::to_value(LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })?;
        let url = self.endpoint(&["user", "auth", "login"])?;

        let auth: AuthBody = self.send(Method::POST, url, Some(body), Auth::Public).await?;
        self.set_token(SecretString::from(auth.token)).await;

        Ok(auth.user.map(convert_user))
    }

    /// Create an account. The returned token is kept, as after `login`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the server rejects the registration,
    /// or an error if the API request fails.
    #[instrument(skip(self, registration), fields(email = %registration.email, request_id = Empty))]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Option<UserProfile>, ApiError> {
        let body = serde_json::to_value(RegisterRequest {
            name: &registration.name,
            email: registration.email.as_str(),
            password: registration.password.expose_secret(),
            phone: registration.phone.as_deref(),
        })?;
        let url = self.endpoint(&["user", "auth", "register"])?;

        let auth: AuthBody = self.send(Method::POST, url, Some(body), Auth::Public).await?;
        self.set_token(SecretString::from(auth.token)).await;

        Ok(auth.user.map(convert_user))
    }

    /// Get the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a token, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(request_id = Empty))]
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint(&["user", "auth", "profile"])?;
        let body: ProfileBody = self.send(Method::GET, url, None, Auth::Required).await?;
        Ok(convert_user(body.user))
    }

    /// Change the signed-in user's profile and return the updated one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a token,
    /// `ApiError::Validation` if the server rejects a field, or an error if
    /// the API request fails.
    #[instrument(skip(self, update), fields(request_id = Empty))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let body = serde_json::to_value(UpdateProfileRequest {
            name: update.name.as_deref(),
            phone: update.phone.as_deref(),
            address: update.address.as_ref(),
        })?;
        let url = self.endpoint(&["user", "auth", "profile"])?;
        let body: ProfileBody = self
            .send(Method::PUT, url, Some(body), Auth::Required)
            .await?;
        Ok(convert_user(body.user))
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// One page of reviews for a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown entry, or an error if the
    /// API request fails.
    #[instrument(skip(self), fields(medicine_id = %id, request_id = Empty))]
    pub async fn reviews(&self, id: &MedicineId, page: u32) -> Result<Page<Review>, ApiError> {
        let page = page.max(1);
        let url = build_url(
            &self.inner.base_url,
            &["reviews", "medicine", id.as_str()],
            &[("page", page.to_string())],
        )?;
        let body: ReviewsBody = self.send(Method::GET, url, None, Auth::Public).await?;
        Ok(convert_review_page(body.reviews, body.pagination, page))
    }

    /// Review a catalog entry as the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthenticated` without a token,
    /// `ApiError::Validation` if the server refuses the review (for example a
    /// second review of the same entry), or an error if the API request fails.
    #[instrument(skip(self, review), fields(medicine_id = %id, rating = review.rating(), request_id = Empty))]
    pub async fn add_review(&self, id: &MedicineId, review: &NewReview) -> Result<Review, ApiError> {
        let body = serde_json::to_value(ReviewRequest {
            rating: review.rating(),
            comment: review.comment(),
        })?;
        let url = self.endpoint(&["reviews", "medicine", id.as_str()])?;
        let body: ReviewBody = self
            .send(Method::POST, url, Some(body), Auth::Required)
            .await?;

        // The entry's average rating just changed
        self.invalidate_medicine(id).await;
        Ok(convert_review(body.review))
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop a cached catalog entry.
    pub async fn invalidate_medicine(&self, id: &MedicineId) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate(id).await;
        }
    }

    async fn cart_mutation(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<Cart, ApiError> {
        let url = self.endpoint(segments)?;
        let body: CartBody = self.send(method, url, body, Auth::Required).await?;
        Ok(convert_cart(body.cart))
    }
}

// =============================================================================
// StorefrontApi
// =============================================================================

impl StorefrontApi for ApiClient {
    #[instrument(skip(self), fields(request_id = Empty))]
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.cart_mutation(Method::GET, &["user", "cart"], None).await
    }

    #[instrument(skip(self), fields(medicine_id = %medicine_id, quantity = quantity.get(), request_id = Empty))]
    async fn add_to_cart(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, ApiError> {
        let body = serde_json::to_value(CartLineRequest {
            medicine_id,
            quantity: quantity.get(),
        })?;
        self.cart_mutation(Method::POST, &["user", "cart", "add"], Some(body))
            .await
    }

    #[instrument(skip(self), fields(medicine_id = %medicine_id, quantity = quantity.get(), request_id = Empty))]
    async fn update_cart_item(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, ApiError> {
        let body = serde_json::to_value(CartLineRequest {
            medicine_id,
            quantity: quantity.get(),
        })?;
        self.cart_mutation(Method::PUT, &["user", "cart", "update"], Some(body))
            .await
    }

    #[instrument(skip(self), fields(medicine_id = %medicine_id, request_id = Empty))]
    async fn remove_from_cart(&self, medicine_id: &MedicineId) -> Result<Cart, ApiError> {
        self.cart_mutation(
            Method::DELETE,
            &["user", "cart", "remove", medicine_id.as_str()],
            None,
        )
        .await
    }

    #[instrument(skip(self), fields(request_id = Empty))]
    async fn clear_cart(&self) -> Result<Cart, ApiError> {
        self.cart_mutation(Method::DELETE, &["user", "cart", "clear"], None)
            .await
    }

    #[instrument(skip(self, delivery_address), fields(city = %delivery_address.city, request_id = Empty))]
    async fn create_order(&self, delivery_address: &DeliveryAddress) -> Result<Order, ApiError> {
        let body = serde_json::to_value(CreateOrderRequest { delivery_address })?;
        let url = self.endpoint(&["user", "orders"])?;
        let body: OrderBody = self
            .send(Method::POST, url, Some(body), Auth::Required)
            .await?;
        let order = convert_order(body.order);

        // Stock of everything ordered just changed
        for id in order.items.iter().filter_map(|i| i.medicine_id.as_ref()) {
            self.invalidate_medicine(id).await;
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(request_id = Empty))]
    async fn get_orders(&self, page: u32) -> Result<Page<Order>, ApiError> {
        let page = page.max(1);
        let url = build_url(
            &self.inner.base_url,
            &["user", "orders"],
            &[("page", page.to_string())],
        )?;
        let body: OrdersBody = self.send(Method::GET, url, None, Auth::Required).await?;
        Ok(convert_order_page(body.orders, body.pagination, page))
    }

    #[instrument(skip(self), fields(order_id = %id, request_id = Empty))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint(&["user", "orders", id.as_str()])?;
        let body: OrderBody = self.send(Method::GET, url, None, Auth::Required).await?;
        Ok(convert_order(body.order))
    }

    #[instrument(skip(self), fields(page = query.page, search = query.search_term(), request_id = Empty))]
    async fn get_medicines(&self, query: &CatalogQuery) -> Result<Page<Medicine>, ApiError> {
        let page = query.page.max(1);
        let mut params = vec![("page", page.to_string())];
        if let Some(limit) = query.page_size {
            params.push(("limit", limit.to_string()));
        }
        if let Some(term) = query.search_term() {
            params.push(("search", term.to_string()));
        }

        let url = build_url(&self.inner.base_url, &["public", "medicines"], &params)?;
        let body: MedicinesBody = self.send(Method::GET, url, None, Auth::Public).await?;
        Ok(convert_medicine_page(body.medicines, body.pagination, page))
    }

    #[instrument(skip(self), fields(medicine_id = %id, request_id = Empty))]
    async fn get_medicine(&self, id: &MedicineId) -> Result<Medicine, ApiError> {
        if let Some(cache) = &self.inner.cache
            && let Some(medicine) = cache.get(id).await
        {
            debug!("Cache hit for medicine");
            return Ok(medicine);
        }

        let url = self.endpoint(&["public", "medicines", id.as_str()])?;
        let body: MedicineBody = self.send(Method::GET, url, None, Auth::Public).await?;
        let medicine = convert_medicine(body.medicine);

        if let Some(cache) = &self.inner.cache {
            cache.insert(medicine.clone()).await;
        }

        Ok(medicine)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Append path segments (percent-encoded) and query pairs to the base URL.
fn build_url(base: &Url, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);

    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }

    Ok(url)
}

/// Decode a response body given its HTTP status.
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
    // Error bodies are not always JSON; fall back to an empty status
    let envelope: Status = serde_json::from_str(text).unwrap_or_default();
    let explicit_failure = envelope.success == Some(false);
    let message = envelope.into_message();

    if !status.is_success() {
        return Err(classify_failure(status, message));
    }

    if explicit_failure {
        return Err(ApiError::Validation(
            message.unwrap_or_else(|| "Request was rejected".to_string()),
        ));
    }

    Ok(serde_json::from_str(text)?)
}

/// Map a non-success status to an error category.
fn classify_failure(status: StatusCode, message: Option<String>) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthenticated,
        StatusCode::NOT_FOUND => {
            ApiError::NotFound(message.unwrap_or_else(|| "Resource not found".to_string()))
        }
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(message.unwrap_or_else(|| "Invalid request".to_string()))
        }
        _ => ApiError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncate_for_log(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}
