//! Cart synchronization store.
//!
//! Holds exactly one cart mirror. Every mutation is forwarded to the server
//! and the mirror is replaced wholesale with the cart the server returns; a
//! failed call leaves the mirror as it was.

use std::future::Future;

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use medistore_core::{MedicineId, Price, Quantity};

use crate::api::{ApiError, Cart, StorefrontApi};
use crate::config::MutationOrdering;
use crate::error::StoreError;

use super::{Lifecycle, Mirror, RequestState};

const FETCH_FAILED: &str = "Failed to fetch cart";
const ADD_FAILED: &str = "Failed to add to cart";
const UPDATE_FAILED: &str = "Failed to update cart";
const REMOVE_FAILED: &str = "Failed to remove item";
const CLEAR_FAILED: &str = "Failed to clear cart";

struct CartSlice {
    cart: Cart,
    lifecycle: Lifecycle,
}

/// Mirror of the signed-in user's cart.
pub struct CartStore<A> {
    api: A,
    slice: RwLock<CartSlice>,
}

impl<A: StorefrontApi> CartStore<A> {
    /// Create a store with an empty mirror.
    pub fn new(api: A, ordering: MutationOrdering) -> Self {
        Self {
            api,
            slice: RwLock::new(CartSlice {
                cart: Cart::empty(),
                lifecycle: Lifecycle::new(ordering),
            }),
        }
    }

    // =========================================================================
    // Server Round-Trips
    // =========================================================================

    /// Replace the mirror with the server's current cart.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the mirror is left untouched.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Cart, StoreError> {
        self.sync(self.api.get_cart(), FETCH_FAILED).await
    }

    /// Add `quantity` units of a medicine.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure (for example an insufficient stock
    /// message from the server); the mirror is left untouched.
    #[instrument(skip(self), fields(medicine_id = %medicine_id, quantity = quantity.get()))]
    pub async fn add(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        self.sync(self.api.add_to_cart(medicine_id, quantity), ADD_FAILED)
            .await
    }

    /// Set a line's quantity. Zero is unrepresentable here; use
    /// [`set_quantity`](Self::set_quantity) or [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the mirror is left untouched.
    #[instrument(skip(self), fields(medicine_id = %medicine_id, quantity = quantity.get()))]
    pub async fn update(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        self.sync(
            self.api.update_cart_item(medicine_id, quantity),
            UPDATE_FAILED,
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the mirror is left untouched.
    #[instrument(skip(self), fields(medicine_id = %medicine_id))]
    pub async fn remove(&self, medicine_id: &MedicineId) -> Result<Cart, StoreError> {
        self.sync(self.api.remove_from_cart(medicine_id), REMOVE_FAILED)
            .await
    }

    /// Empty the cart on the server.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the mirror is left untouched.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, StoreError> {
        self.sync(self.api.clear_cart(), CLEAR_FAILED).await
    }

    // =========================================================================
    // Caller-Level Policies
    // =========================================================================

    /// Set a line to an absolute quantity, routing zero to [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Returns a validation failure for quantities above [`Quantity::MAX`],
    /// otherwise whatever `update`/`remove` returns.
    pub async fn set_quantity(
        &self,
        medicine_id: &MedicineId,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        if quantity == 0 {
            return self.remove(medicine_id).await;
        }

        match Quantity::new(quantity) {
            Ok(quantity) => self.update(medicine_id, quantity).await,
            Err(e) => Err(self.reject(e.into()).await),
        }
    }

    /// Add one unit, creating the line if the mirror does not have it.
    ///
    /// # Errors
    ///
    /// Returns a validation failure at [`Quantity::MAX`], otherwise whatever
    /// `add`/`update` returns.
    pub async fn increment(&self, medicine_id: &MedicineId) -> Result<Cart, StoreError> {
        let current = self.quantity_of(medicine_id).await;

        match current {
            None => self.add(medicine_id, Quantity::ONE).await,
            Some(q) => match q.increment() {
                Some(next) => self.update(medicine_id, next).await,
                None => Err(self
                    .reject(StoreError::validation(format!(
                        "quantity must be at most {}",
                        Quantity::MAX
                    )))
                    .await),
            },
        }
    }

    /// Remove one unit; decrementing the last unit removes the line.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure if the mirror has no such line, otherwise
    /// whatever `update`/`remove` returns.
    pub async fn decrement(&self, medicine_id: &MedicineId) -> Result<Cart, StoreError> {
        let current = self.quantity_of(medicine_id).await;

        match current.map(Quantity::decrement) {
            None => Err(self
                .reject(StoreError::not_found("Item is not in your cart"))
                .await),
            Some(None) => self.remove(medicine_id).await,
            Some(Some(next)) => self.update(medicine_id, next).await,
        }
    }

    // =========================================================================
    // Local State
    // =========================================================================

    /// Clear the mirror without contacting the server (logout).
    pub async fn reset(&self) {
        let mut slice = self.slice.write().await;
        slice.cart = Cart::empty();
        slice.lifecycle.reset();
    }

    /// Clear the mirror after the server consumed the cart (order placed).
    ///
    /// Responses to cart requests issued before this call are dropped.
    pub async fn invalidate(&self) {
        debug!("Cart consumed by order, clearing mirror");
        self.reset().await;
    }

    /// A copy of the current mirror.
    pub async fn snapshot(&self) -> Cart {
        self.slice.read().await.cart.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.slice.read().await.cart.is_empty()
    }

    /// Total units across all lines.
    pub async fn item_count(&self) -> u32 {
        self.slice.read().await.cart.item_count()
    }

    /// The server's total from the last applied response.
    pub async fn total(&self) -> Price {
        self.slice.read().await.cart.total_amount
    }

    /// Client-side sum of line totals, for display before the next response.
    pub async fn estimated_total(&self) -> Price {
        self.slice.read().await.cart.estimated_total()
    }

    pub async fn request_state(&self) -> RequestState {
        self.slice.read().await.lifecycle.state()
    }

    /// Dismiss the recorded error.
    pub async fn clear_error(&self) {
        self.slice.write().await.lifecycle.clear_error();
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn quantity_of(&self, medicine_id: &MedicineId) -> Option<Quantity> {
        self.slice
            .read()
            .await
            .cart
            .item(medicine_id)
            .map(|item| item.quantity)
    }

    async fn reject(&self, error: StoreError) -> StoreError {
        self.slice.write().await.lifecycle.reject(error.clone());
        error
    }

    /// Issue a cart request and settle it against the mirror.
    ///
    /// A stale success is not applied; the caller gets the current mirror.
    async fn sync(
        &self,
        request: impl Future<Output = Result<Cart, ApiError>> + Send,
        fallback: &str,
    ) -> Result<Cart, StoreError> {
        let ticket = self.slice.write().await.lifecycle.begin(Mirror::Cart);

        let result = request.await;

        let mut slice = self.slice.write().await;
        match result {
            Ok(cart) => {
                if slice.lifecycle.succeed(ticket) {
                    slice.cart = cart.clone();
                    Ok(cart)
                } else {
                    warn!("Dropping stale cart response");
                    Ok(slice.cart.clone())
                }
            }
            Err(e) => {
                let error = StoreError::from_api(e, fallback);
                warn!(kind = %error.kind, error = %error, "Cart request failed");
                slice.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use medistore_core::{DeliveryAddress, OrderId};

    use super::*;
    use crate::api::{CartItem, CatalogQuery, Medicine, Order, Page};
    use crate::error::FailureKind;

    /// Backend that prices everything at $2.00 and fails on demand.
    #[derive(Default)]
    struct StubApi {
        lines: Mutex<Vec<(MedicineId, u32)>>,
        fail_with: Mutex<Option<String>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl StubApi {
        fn respond(&self, call: &'static str) -> Result<Cart, ApiError> {
            self.calls.lock().unwrap().push(call);
            if let Some(msg) = self.fail_with.lock().unwrap().clone() {
                return Err(ApiError::Validation(msg));
            }
            let lines = self.lines.lock().unwrap();
            let items: Vec<CartItem> = lines
                .iter()
                .map(|(id, q)| CartItem {
                    medicine_id: id.clone(),
                    name: None,
                    image: None,
                    unit_price: Price::usd(Decimal::new(2, 0)),
                    quantity: Quantity::new(*q).unwrap(),
                })
                .collect();
            let total = items.iter().map(CartItem::line_total).sum();
            Ok(Cart {
                items,
                total_amount: total,
            })
        }

        fn set_line(&self, id: &MedicineId, quantity: u32) {
            let mut lines = self.lines.lock().unwrap();
            if let Some(line) = lines.iter_mut().find(|(i, _)| i == id) {
                line.1 = quantity;
            } else {
                lines.push((id.clone(), quantity));
            }
        }
    }

    impl StorefrontApi for StubApi {
        async fn get_cart(&self) -> Result<Cart, ApiError> {
            self.respond("get")
        }

        async fn add_to_cart(&self, id: &MedicineId, q: Quantity) -> Result<Cart, ApiError> {
            if self.fail_with.lock().unwrap().is_none() {
                let existing = self
                    .lines
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(i, _)| i == id)
                    .map_or(0, |(_, q)| *q);
                self.set_line(id, existing + q.get());
            }
            self.respond("add")
        }

        async fn update_cart_item(&self, id: &MedicineId, q: Quantity) -> Result<Cart, ApiError> {
            if self.fail_with.lock().unwrap().is_none() {
                self.set_line(id, q.get());
            }
            self.respond("update")
        }

        async fn remove_from_cart(&self, id: &MedicineId) -> Result<Cart, ApiError> {
            if self.fail_with.lock().unwrap().is_none() {
                self.lines.lock().unwrap().retain(|(i, _)| i != id);
            }
            self.respond("remove")
        }

        async fn clear_cart(&self) -> Result<Cart, ApiError> {
            self.lines.lock().unwrap().clear();
            self.respond("clear")
        }

        async fn create_order(&self, _: &DeliveryAddress) -> Result<Order, ApiError> {
            Err(ApiError::Unauthenticated)
        }

        async fn get_orders(&self, _: u32) -> Result<Page<Order>, ApiError> {
            Err(ApiError::Unauthenticated)
        }

        async fn get_order(&self, _: &OrderId) -> Result<Order, ApiError> {
            Err(ApiError::Unauthenticated)
        }

        async fn get_medicines(&self, _: &CatalogQuery) -> Result<Page<Medicine>, ApiError> {
            Err(ApiError::Unauthenticated)
        }

        async fn get_medicine(&self, _: &MedicineId) -> Result<Medicine, ApiError> {
            Err(ApiError::Unauthenticated)
        }
    }

    fn store() -> CartStore<StubApi> {
        CartStore::new(StubApi::default(), MutationOrdering::Arrival)
    }

    fn med(id: &str) -> MedicineId {
        MedicineId::new(id)
    }

    #[tokio::test]
    async fn test_add_replaces_mirror_with_server_cart() {
        let store = store();
        let cart = store.add(&med("med-1"), Quantity::new(2).unwrap()).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_amount.amount, Decimal::new(4, 0));
        assert_eq!(store.snapshot().await, cart);
        assert!(!store.request_state().await.loading);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_mirror_untouched() {
        let store = store();
        store.add(&med("med-1"), Quantity::ONE).await.unwrap();
        let before = store.snapshot().await;

        *store.api.fail_with.lock().unwrap() = Some("Insufficient stock".to_string());
        let err = store
            .add(&med("med-2"), Quantity::ONE)
            .await
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Validation);
        assert_eq!(err.message, "Insufficient stock");
        assert_eq!(store.snapshot().await, before);
        assert_eq!(store.request_state().await.error, Some(err));
    }

    #[tokio::test]
    async fn test_set_quantity_zero_routes_to_remove() {
        let store = store();
        store.add(&med("med-1"), Quantity::new(3).unwrap()).await.unwrap();

        let cart = store.set_quantity(&med("med-1"), 0).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(
            *store.api.calls.lock().unwrap(),
            ["add", "remove"]
        );
    }

    #[tokio::test]
    async fn test_set_quantity_above_max_is_rejected_locally() {
        let store = store();
        let err = store.set_quantity(&med("med-1"), 5000).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::Validation);
        assert!(store.api.calls.lock().unwrap().is_empty());
        assert!(store.request_state().await.error.is_some());
    }

    #[tokio::test]
    async fn test_decrement_last_unit_removes_line() {
        let store = store();
        store.add(&med("med-1"), Quantity::ONE).await.unwrap();

        let cart = store.decrement(&med("med-1")).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(store.api.calls.lock().unwrap().last(), Some(&"remove"));
    }

    #[tokio::test]
    async fn test_increment_adds_missing_line_then_updates() {
        let store = store();
        store.increment(&med("med-1")).await.unwrap();
        let cart = store.increment(&med("med-1")).await.unwrap();

        assert_eq!(cart.items[0].quantity.get(), 2);
        assert_eq!(*store.api.calls.lock().unwrap(), ["add", "update"]);
    }

    #[tokio::test]
    async fn test_decrement_unknown_line_is_not_found() {
        let store = store();
        let err = store.decrement(&med("ghost")).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }

    #[tokio::test]
    async fn test_success_clears_error_and_dismiss_works() {
        let store = store();
        *store.api.fail_with.lock().unwrap() = Some("Insufficient stock".to_string());
        store.add(&med("med-1"), Quantity::ONE).await.unwrap_err();
        assert!(store.request_state().await.error.is_some());

        store.clear_error().await;
        assert!(store.request_state().await.error.is_none());

        store.add(&med("med-1"), Quantity::ONE).await.unwrap_err();
        *store.api.fail_with.lock().unwrap() = None;
        store.fetch().await.unwrap();
        assert!(store.request_state().await.error.is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_mirror_locally() {
        let store = store();
        store.add(&med("med-1"), Quantity::ONE).await.unwrap();

        store.reset().await;

        assert!(store.is_empty().await);
        assert_eq!(store.total().await, Price::zero());
        assert_eq!(*store.api.calls.lock().unwrap(), ["add"]);
    }

    #[tokio::test]
    async fn test_estimated_total_matches_lines() {
        let store = store();
        store.add(&med("a"), Quantity::new(2).unwrap()).await.unwrap();
        store.add(&med("b"), Quantity::ONE).await.unwrap();

        assert_eq!(store.estimated_total().await.amount, Decimal::new(6, 0));
        assert_eq!(store.item_count().await, 3);
    }
}
