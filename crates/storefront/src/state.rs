//! Application state owned by the application root.
//!
//! There are no ambient singletons: the binary builds one [`AppState`] and
//! hands clones (cheap, `Arc`-backed) to whatever renders or dispatches.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use medistore_core::{Email, MedicineId};

use crate::api::{
    ApiClient, ApiError, NewReview, Page, ProfileUpdate, Registration, Review, UserProfile,
};
use crate::config::StorefrontConfig;
use crate::error::StoreError;
use crate::store::{CartStore, CatalogStore, OrderStore};

const LOGIN_FAILED: &str = "Login failed";
const REGISTER_FAILED: &str = "Registration failed";
const PROFILE_FAILED: &str = "Failed to fetch profile";
const PROFILE_UPDATE_FAILED: &str = "Failed to update profile";
const REVIEWS_FAILED: &str = "Failed to fetch reviews";
const REVIEW_FAILED: &str = "Failed to add review";
const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Application state shared by every view.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: Arc<CartStore<ApiClient>>,
    orders: Arc<OrderStore<ApiClient>>,
    catalog: Arc<CatalogStore<ApiClient>>,
}

impl AppState {
    /// Create the API client and empty store slices.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config`.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let ordering = config.mutation_ordering;

        let cart = Arc::new(CartStore::new(api.clone(), ordering));
        let orders = Arc::new(OrderStore::new(api.clone(), Arc::clone(&cart), ordering));
        let catalog = Arc::new(CatalogStore::new(api.clone(), config.page_size, ordering));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                cart,
                orders,
                catalog,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &Arc<CartStore<ApiClient>> {
        &self.inner.cart
    }

    #[must_use]
    pub fn orders(&self) -> &Arc<OrderStore<ApiClient>> {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<CatalogStore<ApiClient>> {
        &self.inner.catalog
    }

    /// Whether authenticated routes can be attempted.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.api.has_token().await
    }

    /// Sign in. The cart and order slices are reset so nothing from a
    /// previous session survives.
    ///
    /// # Errors
    ///
    /// Returns a validation failure for bad credentials, otherwise the
    /// categorized API failure.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<UserProfile>, StoreError> {
        let user = self
            .inner
            .api
            .login(email, password)
            .await
            .map_err(|e| credentials_error(e, LOGIN_FAILED))?;

        self.reset_session_slices().await;
        info!("Signed in");
        Ok(user)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns the server's validation message (for example an email already
    /// in use), otherwise the categorized API failure.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration,
    ) -> Result<Option<UserProfile>, StoreError> {
        let user = self
            .inner
            .api
            .register(registration)
            .await
            .map_err(|e| credentials_error(e, REGISTER_FAILED))?;

        self.reset_session_slices().await;
        info!("Registered and signed in");
        Ok(user)
    }

    /// The signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an unauthenticated failure without a session, otherwise the
    /// categorized API failure.
    pub async fn profile(&self) -> Result<UserProfile, StoreError> {
        self.inner
            .api
            .profile()
            .await
            .map_err(|e| StoreError::from_api(e, PROFILE_FAILED))
    }

    /// Change profile fields. An update with nothing set is rejected locally.
    ///
    /// # Errors
    ///
    /// Returns a validation failure for an empty update or a blank address
    /// field, otherwise the categorized API failure.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, StoreError> {
        if update.is_empty() {
            return Err(StoreError::validation("Nothing to update"));
        }
        if let Some(address) = &update.address {
            address.validate()?;
        }

        let profile = self
            .inner
            .api
            .update_profile(update)
            .await
            .map_err(|e| StoreError::from_api(e, PROFILE_UPDATE_FAILED))?;
        info!("Profile updated");
        Ok(profile)
    }

    /// One page of reviews for a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure for an unknown entry, otherwise the
    /// categorized API failure.
    pub async fn reviews(&self, id: &MedicineId, page: u32) -> Result<Page<Review>, StoreError> {
        self.inner
            .api
            .reviews(id, page)
            .await
            .map_err(|e| StoreError::from_api(e, REVIEWS_FAILED))
    }

    /// Review a catalog entry. The entry's cached details are dropped so the
    /// next view shows the new average.
    ///
    /// # Errors
    ///
    /// Returns an unauthenticated failure without a session, the server's
    /// validation message if it refuses the review, otherwise the categorized
    /// API failure.
    #[instrument(skip(self, review), fields(medicine_id = %id))]
    pub async fn add_review(&self, id: &MedicineId, review: &NewReview) -> Result<Review, StoreError> {
        let added = self
            .inner
            .api
            .add_review(id, review)
            .await
            .map_err(|e| StoreError::from_api(e, REVIEW_FAILED))?;
        info!(rating = added.rating, "Review added");
        Ok(added)
    }

    /// Drop the token and clear every per-user slice.
    pub async fn logout(&self) {
        self.inner.api.clear_token().await;
        self.reset_session_slices().await;
        info!("Signed out");
    }

    async fn reset_session_slices(&self) {
        self.inner.cart.reset().await;
        self.inner.orders.reset().await;
    }
}

/// On the credential routes a 401 means wrong credentials, not a missing session.
fn credentials_error(err: ApiError, fallback: &str) -> StoreError {
    match err {
        ApiError::Unauthenticated => StoreError::validation(BAD_CREDENTIALS),
        other => StoreError::from_api(other, fallback),
    }
}
