//! Order submission and history.
//!
//! `place_order` turns the server-side cart into an order in a single call.
//! It refuses to run on an empty cart mirror, and only one submission can be
//! in flight at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use medistore_core::{DeliveryAddress, OrderId};

use crate::api::{Order, Page, Pagination, StorefrontApi};
use crate::config::MutationOrdering;
use crate::error::StoreError;

use super::{CartStore, Lifecycle, Mirror, RequestState};

const CREATE_FAILED: &str = "Failed to create order";
const LIST_FAILED: &str = "Failed to fetch orders";
const DETAIL_FAILED: &str = "Failed to fetch order";

struct OrderSlice {
    /// Newest first.
    orders: Vec<Order>,
    pagination: Option<Pagination>,
    current: Option<Order>,
    lifecycle: Lifecycle,
}

/// Order history plus the submission flow.
pub struct OrderStore<A> {
    api: A,
    cart: Arc<CartStore<A>>,
    submitting: AtomicBool,
    slice: RwLock<OrderSlice>,
}

/// Releases the submission flag however `place_order` exits.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: StorefrontApi> OrderStore<A> {
    pub fn new(api: A, cart: Arc<CartStore<A>>, ordering: MutationOrdering) -> Self {
        Self {
            api,
            cart,
            submitting: AtomicBool::new(false),
            slice: RwLock::new(OrderSlice {
                orders: Vec::new(),
                pagination: None,
                current: None,
                lifecycle: Lifecycle::new(ordering),
            }),
        }
    }

    /// Place an order for everything in the cart.
    ///
    /// The address is checked locally first. An empty cart mirror fails with
    /// [`FailureKind::EmptyCart`](crate::error::FailureKind::EmptyCart) without
    /// calling the API. On success the order is prepended to the history and
    /// the cart mirror is invalidated.
    ///
    /// # Errors
    ///
    /// Returns a validation failure for a blank address field, `EmptyCart`,
    /// `Busy` if another submission is in flight, or the categorized API
    /// failure. The cart mirror is untouched on every failure path.
    #[instrument(skip(self, address), fields(city = %address.city))]
    pub async fn place_order(&self, address: DeliveryAddress) -> Result<Order, StoreError> {
        if let Err(e) = address.validate() {
            return Err(self.reject(e.into()).await);
        }

        if self.cart.is_empty().await {
            return Err(self.reject(StoreError::empty_cart()).await);
        }

        if self
            .submitting
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("Order submission already in flight");
            return Err(StoreError::busy());
        }
        let _guard = SubmitGuard(&self.submitting);

        let ticket = self.slice.write().await.lifecycle.begin(Mirror::History);

        let result = self.api.create_order(&address).await;

        match result {
            Ok(order) => {
                // The server consumed the cart whether or not this slice
                // still wants the response
                self.cart.invalidate().await;

                // Merged into the history rather than replacing it; only the
                // epoch decides
                let mut slice = self.slice.write().await;
                if slice.lifecycle.accept(ticket) {
                    if !slice.orders.iter().any(|o| o.id == order.id) {
                        slice.orders.insert(0, order.clone());
                    }
                    slice.current = Some(order.clone());
                    slice.lifecycle.supersede(Mirror::CurrentOrder, ticket);
                }
                info!(order_id = %order.id, total = %order.total_amount, "Order placed");
                Ok(order)
            }
            Err(e) => {
                let error = StoreError::from_api(e, CREATE_FAILED);
                warn!(kind = %error.kind, error = %error, "Order submission failed");
                self.slice.write().await.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }

    /// Replace the history with one page of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the history is left untouched.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self, page: u32) -> Result<Page<Order>, StoreError> {
        let ticket = self.slice.write().await.lifecycle.begin(Mirror::History);

        let result = self.api.get_orders(page).await;

        let mut slice = self.slice.write().await;
        match result {
            Ok(page) => {
                if slice.lifecycle.succeed(ticket) {
                    slice.orders.clone_from(&page.items);
                    slice.pagination = Some(page.pagination);
                    Ok(page)
                } else {
                    warn!("Dropping stale order history response");
                    Ok(Page {
                        items: slice.orders.clone(),
                        pagination: slice.pagination.unwrap_or(page.pagination),
                    })
                }
            }
            Err(e) => {
                let error = StoreError::from_api(e, LIST_FAILED);
                warn!(kind = %error.kind, error = %error, "Order history fetch failed");
                slice.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }

    /// Fetch one order and make it the current one.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure if the order does not exist, otherwise the
    /// categorized failure.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order, StoreError> {
        let ticket = self.slice.write().await.lifecycle.begin(Mirror::CurrentOrder);

        let result = self.api.get_order(id).await;

        let mut slice = self.slice.write().await;
        match result {
            Ok(order) => {
                if slice.lifecycle.succeed(ticket) {
                    slice.current = Some(order.clone());
                } else {
                    warn!("Dropping stale order response");
                }
                Ok(order)
            }
            Err(e) => {
                let error = StoreError::from_api(e, DETAIL_FAILED);
                warn!(kind = %error.kind, error = %error, "Order fetch failed");
                slice.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }

    /// Forget history and the current order (logout).
    pub async fn reset(&self) {
        let mut slice = self.slice.write().await;
        slice.orders.clear();
        slice.pagination = None;
        slice.current = None;
        slice.lifecycle.reset();
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.slice.read().await.orders.clone()
    }

    pub async fn pagination(&self) -> Option<Pagination> {
        self.slice.read().await.pagination
    }

    pub async fn current(&self) -> Option<Order> {
        self.slice.read().await.current.clone()
    }

    /// Whether a submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub async fn request_state(&self) -> RequestState {
        self.slice.read().await.lifecycle.state()
    }

    /// Dismiss the recorded error.
    pub async fn clear_error(&self) {
        self.slice.write().await.lifecycle.clear_error();
    }

    async fn reject(&self, error: StoreError) -> StoreError {
        self.slice.write().await.lifecycle.reject(error.clone());
        error
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use medistore_core::{MedicineId, OrderStatus, Price, Quantity};

    use super::*;
    use crate::api::{ApiError, Cart, CartItem, CatalogQuery, Medicine};
    use crate::error::FailureKind;

    /// One-line cart backend that can place orders.
    #[derive(Default)]
    struct StubApi {
        has_line: Mutex<bool>,
        reject_order: Mutex<Option<String>>,
        order_calls: AtomicUsize,
    }

    impl StubApi {
        fn cart(&self) -> Cart {
            if !*self.has_line.lock().unwrap() {
                return Cart::empty();
            }
            let item = CartItem {
                medicine_id: MedicineId::new("med-1"),
                name: Some("Aspirin".to_string()),
                image: None,
                unit_price: Price::usd(Decimal::new(5, 0)),
                quantity: Quantity::ONE,
            };
            Cart {
                total_amount: item.line_total(),
                items: vec![item],
            }
        }
    }

    fn order(id: &str, address: &DeliveryAddress) -> Order {
        Order {
            id: OrderId::new(id),
            order_number: None,
            status: OrderStatus::Pending,
            items: Vec::new(),
            delivery_address: address.clone(),
            total_amount: Price::usd(Decimal::new(5, 0)),
            booking_date: Utc::now(),
            updated_at: None,
        }
    }

    impl StorefrontApi for Arc<StubApi> {
        async fn get_cart(&self) -> Result<Cart, ApiError> {
            Ok(self.cart())
        }

        async fn add_to_cart(&self, _: &MedicineId, _: Quantity) -> Result<Cart, ApiError> {
            *self.has_line.lock().unwrap() = true;
            Ok(self.cart())
        }

        async fn update_cart_item(&self, _: &MedicineId, _: Quantity) -> Result<Cart, ApiError> {
            Ok(self.cart())
        }

        async fn remove_from_cart(&self, _: &MedicineId) -> Result<Cart, ApiError> {
            *self.has_line.lock().unwrap() = false;
            Ok(self.cart())
        }

        async fn clear_cart(&self) -> Result<Cart, ApiError> {
            *self.has_line.lock().unwrap() = false;
            Ok(self.cart())
        }

        async fn create_order(&self, address: &DeliveryAddress) -> Result<Order, ApiError> {
            self.order_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = self.reject_order.lock().unwrap().clone() {
                return Err(ApiError::Validation(msg));
            }
            *self.has_line.lock().unwrap() = false;
            Ok(order("o-3", address))
        }

        async fn get_orders(&self, page: u32) -> Result<Page<Order>, ApiError> {
            let address = DeliveryAddress::new("1 Main St", "Springfield", "IL", "62701");
            Ok(Page {
                items: vec![order("o-2", &address), order("o-1", &address)],
                pagination: Pagination {
                    current_page: page,
                    total_pages: 1,
                    total_items: Some(2),
                },
            })
        }

        async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
            Err(ApiError::NotFound(format!("Order {id} not found")))
        }

        async fn get_medicines(&self, _: &CatalogQuery) -> Result<Page<Medicine>, ApiError> {
            Err(ApiError::Unauthenticated)
        }

        async fn get_medicine(&self, _: &MedicineId) -> Result<Medicine, ApiError> {
            Err(ApiError::Unauthenticated)
        }
    }

    fn stores() -> (Arc<StubApi>, Arc<CartStore<Arc<StubApi>>>, OrderStore<Arc<StubApi>>) {
        let api = Arc::new(StubApi::default());
        let cart = Arc::new(CartStore::new(Arc::clone(&api), MutationOrdering::Arrival));
        let orders = OrderStore::new(Arc::clone(&api), Arc::clone(&cart), MutationOrdering::Arrival);
        (api, cart, orders)
    }

    fn address() -> DeliveryAddress {
        DeliveryAddress::new("1 Main St", "Springfield", "IL", "62701")
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_api() {
        let (api, _cart, orders) = stores();

        let err = orders.place_order(address()).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::EmptyCart);
        assert_eq!(api.order_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orders.request_state().await.error, Some(err));
    }

    #[tokio::test]
    async fn test_blank_address_field_is_rejected_locally() {
        let (api, cart, orders) = stores();
        cart.add(&MedicineId::new("med-1"), Quantity::ONE).await.unwrap();

        let err = orders
            .place_order(DeliveryAddress::new("1 Main St", " ", "IL", "62701"))
            .await
            .unwrap_err();

        assert_eq!(err.message, "City is required");
        assert_eq!(api.order_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_prepends_order_and_clears_cart() {
        let (_api, cart, orders) = stores();
        orders.fetch_orders(1).await.unwrap();
        cart.add(&MedicineId::new("med-1"), Quantity::ONE).await.unwrap();

        let placed = orders.place_order(address()).await.unwrap();

        assert!(cart.is_empty().await);
        let history = orders.orders().await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, placed.id);
        assert_eq!(orders.current().await, Some(placed));
        assert!(!orders.is_submitting());
    }

    #[tokio::test]
    async fn test_failure_leaves_cart_untouched() {
        let (api, cart, orders) = stores();
        cart.add(&MedicineId::new("med-1"), Quantity::ONE).await.unwrap();
        let before = cart.snapshot().await;
        *api.reject_order.lock().unwrap() = Some("Medicine out of stock".to_string());

        let err = orders.place_order(address()).await.unwrap_err();

        assert_eq!(err.message, "Medicine out of stock");
        assert_eq!(cart.snapshot().await, before);
        assert!(!orders.is_submitting());
    }

    #[tokio::test]
    async fn test_fetch_order_not_found_keeps_current() {
        let (_api, _cart, orders) = stores();
        let err = orders.fetch_order(&OrderId::new("nope")).await.unwrap_err();

        assert_eq!(err.kind, FailureKind::NotFound);
        assert!(orders.current().await.is_none());

        orders.clear_error().await;
        assert_eq!(orders.request_state().await, RequestState::default());
    }

    #[tokio::test]
    async fn test_reset_forgets_history() {
        let (_api, _cart, orders) = stores();
        orders.fetch_orders(1).await.unwrap();
        assert_eq!(orders.pagination().await.map(|p| p.total_pages), Some(1));

        orders.reset().await;

        assert!(orders.orders().await.is_empty());
        assert!(orders.pagination().await.is_none());
    }
}
