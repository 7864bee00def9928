//! `medistore orders ...` and `medistore checkout`

use medistore_core::{DeliveryAddress, OrderId};
use medistore_storefront::state::AppState;

use super::{CliError, settle};
use crate::view;

/// Place an order for the current cart.
///
/// The cart mirror is fetched first; an empty cart never reaches the order
/// endpoint.
pub async fn checkout(state: &AppState, address: DeliveryAddress) -> Result<(), CliError> {
    let cart = state.cart();
    let fetched = cart.fetch().await;
    settle(fetched, cart.clear_error()).await?;

    let orders = state.orders();
    let result = orders.place_order(address).await;
    let order = settle(result, orders.clear_error()).await?;

    tracing::info!(order = %order.display_number(), "Order placed successfully");
    view::emit(&view::render_order(&order));
    Ok(())
}

pub async fn list(state: &AppState, page: u32) -> Result<(), CliError> {
    let orders = state.orders();
    let result = orders.fetch_orders(page).await;
    let fetched = settle(result, orders.clear_error()).await?;

    view::emit(&view::render_order_list(
        &fetched.items,
        Some(&fetched.pagination),
    ));
    Ok(())
}

pub async fn show(state: &AppState, id: &str) -> Result<(), CliError> {
    let orders = state.orders();
    let result = orders.fetch_order(&OrderId::new(id)).await;
    let order = settle(result, orders.clear_error()).await?;

    view::emit(&view::render_order(&order));
    Ok(())
}
