//! Integration tests for Medistore.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios
//! cargo test -p medistore-integration-tests
//!
//! # Including the live API smoke test
//! MEDISTORE_API_URL=http://localhost:5000/api \
//!     cargo test -p medistore-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_sync` - cart mirror behavior, including racing updates
//! - `order_flow` - checkout preconditions and cart invalidation
//! - `catalog` - search and pagination
//! - `live_api` - smoke test against a running server (ignored by default)
//!
//! [`FakeBackend`] is an in-memory server implementing [`StorefrontApi`]. Its
//! responses are computed when a call arrives; [`FakeBackend::hold`] delays
//! delivery so a test can choose the order in which responses land.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, Notify, oneshot};

use medistore_core::{
    DeliveryAddress, MedicineId, OrderId, OrderStatus, Price, Quantity, Rating,
};
use medistore_storefront::api::{
    ApiError, Cart, CartItem, CatalogQuery, Medicine, Order, OrderItem, Page, Pagination,
    StorefrontApi,
};

/// Page size the fake uses when a catalog query does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Orders per history page.
pub const ORDERS_PAGE_SIZE: u32 = 10;

/// The backend operations, for call counting, gating and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetCart,
    AddToCart,
    UpdateCart,
    RemoveFromCart,
    ClearCart,
    CreateOrder,
    GetOrders,
    GetOrder,
    GetMedicines,
    GetMedicine,
}

/// Delays one response until released.
///
/// Dropping the gate without releasing it also lets the response through.
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
struct ServerState {
    catalog: Vec<Medicine>,
    cart: Vec<(MedicineId, Quantity)>,
    /// Newest first.
    orders: Vec<Order>,
    signed_out: bool,
    discount: Decimal,
    calls: HashMap<Op, usize>,
    gates: HashMap<Op, VecDeque<oneshot::Receiver<()>>>,
    failures: HashMap<Op, VecDeque<ApiError>>,
}

impl ServerState {
    fn medicine(&self, id: &MedicineId) -> Result<&Medicine, ApiError> {
        self.catalog
            .iter()
            .find(|m| &m.id == id)
            .ok_or_else(|| ApiError::NotFound("Medicine not found".to_string()))
    }

    const fn require_session(&self) -> Result<(), ApiError> {
        if self.signed_out {
            Err(ApiError::Unauthenticated)
        } else {
            Ok(())
        }
    }

    fn check_stock(&self, id: &MedicineId, quantity: Quantity) -> Result<(), ApiError> {
        let medicine = self.medicine(id)?;
        match medicine.stock {
            Some(stock) if quantity.get() > stock => Err(ApiError::Validation(format!(
                "Insufficient stock. Only {stock} available"
            ))),
            _ => Ok(()),
        }
    }

    fn line_mut(&mut self, id: &MedicineId) -> Result<&mut Quantity, ApiError> {
        self.cart
            .iter_mut()
            .find(|(line_id, _)| line_id == id)
            .map(|(_, quantity)| quantity)
            .ok_or_else(|| ApiError::NotFound("Item not found in cart".to_string()))
    }

    fn add(&mut self, id: &MedicineId, quantity: Quantity) -> Result<Cart, ApiError> {
        let existing = self
            .cart
            .iter()
            .find(|(line_id, _)| line_id == id)
            .map_or(0, |(_, q)| q.get());
        let combined = Quantity::nonzero(existing + quantity.get()).unwrap_or(quantity);
        self.check_stock(id, combined)?;

        if let Some(line) = self.cart.iter_mut().find(|(line_id, _)| line_id == id) {
            line.1 = combined;
        } else {
            self.cart.push((id.clone(), combined));
        }
        Ok(self.cart_view())
    }

    fn update(&mut self, id: &MedicineId, quantity: Quantity) -> Result<Cart, ApiError> {
        self.check_stock(id, quantity)?;
        *self.line_mut(id)? = quantity;
        Ok(self.cart_view())
    }

    fn remove(&mut self, id: &MedicineId) -> Result<Cart, ApiError> {
        self.line_mut(id)?;
        self.cart.retain(|(line_id, _)| line_id != id);
        Ok(self.cart_view())
    }

    fn cart_view(&self) -> Cart {
        let items: Vec<CartItem> = self
            .cart
            .iter()
            .filter_map(|(id, quantity)| {
                let medicine = self.medicine(id).ok()?;
                Some(CartItem {
                    medicine_id: id.clone(),
                    name: Some(medicine.name.clone()),
                    image: medicine.image.clone(),
                    unit_price: medicine.price,
                    quantity: *quantity,
                })
            })
            .collect();

        let gross: Decimal = items.iter().map(|i| i.line_total().amount).sum();
        let total = if items.is_empty() {
            Decimal::ZERO
        } else {
            (gross - self.discount).max(Decimal::ZERO)
        };

        Cart {
            items,
            total_amount: Price::usd(total),
        }
    }

    fn create_order(&mut self, address: &DeliveryAddress) -> Result<Order, ApiError> {
        let cart = self.cart_view();
        if cart.is_empty() {
            return Err(ApiError::Validation("Cart is empty".to_string()));
        }

        let number = self.orders.len() + 1;
        let order = Order {
            id: OrderId::new(format!("order-{number}")),
            order_number: Some(format!("ORD-{number:05}")),
            status: OrderStatus::Pending,
            items: cart
                .items
                .iter()
                .map(|item| OrderItem {
                    medicine_id: Some(item.medicine_id.clone()),
                    name: item.name.clone().unwrap_or_default(),
                    price: item.unit_price,
                    quantity: item.quantity,
                })
                .collect(),
            delivery_address: address.clone(),
            total_amount: cart.total_amount,
            booking_date: Utc::now(),
            updated_at: None,
        };

        self.orders.insert(0, order.clone());
        self.cart.clear();
        Ok(order)
    }

    fn medicines(&self, query: &CatalogQuery) -> Page<Medicine> {
        let needle = query.search_term().map(str::to_lowercase);
        let matching: Vec<&Medicine> = self
            .catalog
            .iter()
            .filter(|m| {
                needle
                    .as_deref()
                    .is_none_or(|n| m.name.to_lowercase().contains(n))
            })
            .collect();

        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        paginate(&matching, query.page, page_size, |m| (*m).clone())
    }
}

fn paginate<S, T>(all: &[S], page: u32, page_size: u32, map: impl Fn(&S) -> T) -> Page<T> {
    let page_size = page_size.max(1);
    let total = u32::try_from(all.len()).unwrap_or(u32::MAX);
    let total_pages = total.div_ceil(page_size).max(1);
    let current_page = page.clamp(1, total_pages);
    let skip = ((current_page - 1) * page_size) as usize;

    Page {
        items: all
            .iter()
            .skip(skip)
            .take(page_size as usize)
            .map(map)
            .collect(),
        pagination: Pagination {
            current_page,
            total_pages,
            total_items: Some(u64::from(total)),
        },
    }
}

struct Inner {
    state: Mutex<ServerState>,
    called: Notify,
}

/// In-memory storefront server.
#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<Inner>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// A signed-in session with an empty catalog and cart.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(Vec::new())
    }

    /// A signed-in session selling `catalog`.
    #[must_use]
    pub fn with_catalog(catalog: Vec<Medicine>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ServerState {
                    catalog,
                    ..ServerState::default()
                }),
                called: Notify::new(),
            }),
        }
    }

    /// Take a flat amount off every non-empty cart total.
    ///
    /// Makes the server's total differ from the sum of the lines.
    pub async fn set_discount(&self, amount: Decimal) {
        self.inner.state.lock().await.discount = amount;
    }

    /// End the session; authenticated operations now fail.
    pub async fn sign_out(&self) {
        self.inner.state.lock().await.signed_out = true;
    }

    /// Delay the response of the next not-yet-gated call to `op`.
    pub async fn hold(&self, op: Op) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.inner
            .state
            .lock()
            .await
            .gates
            .entry(op)
            .or_default()
            .push_back(rx);
        Gate(tx)
    }

    /// Make the next call to `op` fail with `error` without touching state.
    pub async fn fail_next(&self, op: Op, error: ApiError) {
        self.inner
            .state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// How many times `op` has reached the server.
    pub async fn calls(&self, op: Op) -> usize {
        self.inner
            .state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Wait until `op` has reached the server at least `count` times.
    pub async fn wait_for_calls(&self, op: Op, count: usize) {
        loop {
            let notified = self.inner.called.notified();
            if self.calls(op).await >= count {
                return;
            }
            notified.await;
        }
    }

    /// The server's cart, as a fresh `GET /user/cart` would return it.
    pub async fn server_cart(&self) -> Cart {
        self.inner.state.lock().await.cart_view()
    }

    /// Orders placed so far, newest first.
    pub async fn placed_orders(&self) -> Vec<Order> {
        self.inner.state.lock().await.orders.clone()
    }

    /// Count the call, compute the response, then deliver it once any gate
    /// for this call is released.
    async fn respond<T>(
        &self,
        op: Op,
        handle: impl FnOnce(&mut ServerState) -> Result<T, ApiError> + Send,
    ) -> Result<T, ApiError> {
        let (result, gate) = {
            let mut state = self.inner.state.lock().await;
            *state.calls.entry(op).or_default() += 1;

            let injected = state.failures.get_mut(&op).and_then(VecDeque::pop_front);
            let result = match injected {
                Some(error) => Err(error),
                None => handle(&mut *state),
            };
            let gate = state.gates.get_mut(&op).and_then(VecDeque::pop_front);
            (result, gate)
        };
        self.inner.called.notify_waiters();

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }
}

impl StorefrontApi for FakeBackend {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        self.respond(Op::GetCart, |s| {
            s.require_session()?;
            Ok(s.cart_view())
        })
        .await
    }

    async fn add_to_cart(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, ApiError> {
        self.respond(Op::AddToCart, |s| {
            s.require_session()?;
            s.add(medicine_id, quantity)
        })
        .await
    }

    async fn update_cart_item(
        &self,
        medicine_id: &MedicineId,
        quantity: Quantity,
    ) -> Result<Cart, ApiError> {
        self.respond(Op::UpdateCart, |s| {
            s.require_session()?;
            s.update(medicine_id, quantity)
        })
        .await
    }

    async fn remove_from_cart(&self, medicine_id: &MedicineId) -> Result<Cart, ApiError> {
        self.respond(Op::RemoveFromCart, |s| {
            s.require_session()?;
            s.remove(medicine_id)
        })
        .await
    }

    async fn clear_cart(&self) -> Result<Cart, ApiError> {
        self.respond(Op::ClearCart, |s| {
            s.require_session()?;
            s.cart.clear();
            Ok(s.cart_view())
        })
        .await
    }

    async fn create_order(&self, delivery_address: &DeliveryAddress) -> Result<Order, ApiError> {
        self.respond(Op::CreateOrder, |s| {
            s.require_session()?;
            s.create_order(delivery_address)
        })
        .await
    }

    async fn get_orders(&self, page: u32) -> Result<Page<Order>, ApiError> {
        self.respond(Op::GetOrders, |s| {
            s.require_session()?;
            Ok(paginate(&s.orders, page, ORDERS_PAGE_SIZE, Clone::clone))
        })
        .await
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        self.respond(Op::GetOrder, |s| {
            s.require_session()?;
            s.orders
                .iter()
                .find(|o| &o.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
        })
        .await
    }

    async fn get_medicines(&self, query: &CatalogQuery) -> Result<Page<Medicine>, ApiError> {
        self.respond(Op::GetMedicines, |s| Ok(s.medicines(query)))
            .await
    }

    async fn get_medicine(&self, id: &MedicineId) -> Result<Medicine, ApiError> {
        self.respond(Op::GetMedicine, |s| s.medicine(id).cloned())
            .await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A catalog entry priced at `cents`, with optional stock.
#[must_use]
pub fn medicine(id: &str, name: &str, cents: i64, stock: Option<u32>) -> Medicine {
    Medicine {
        id: MedicineId::new(id),
        name: name.to_string(),
        description: format!("{name} tablets"),
        price: Price::usd(Decimal::new(cents, 2)),
        image: Some(format!("uploads/{id}.png")),
        average_rating: Rating::new(4.5),
        stock,
        category: Some("Pain Relief".to_string()),
    }
}

/// A complete delivery address.
#[must_use]
pub fn address() -> DeliveryAddress {
    DeliveryAddress::new("1 Main St", "Springfield", "IL", "62701")
}

/// Shorthand for a valid quantity in tests.
///
/// Out-of-range values clamp to the nearest valid quantity.
#[must_use]
pub fn qty(value: u32) -> Quantity {
    Quantity::new(value.clamp(1, Quantity::MAX)).unwrap_or(Quantity::ONE)
}
