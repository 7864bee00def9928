//! `medistore cart ...`
//!
//! Every mutation prints the cart exactly as the server returned it.

use medistore_core::{MedicineId, Quantity};
use medistore_storefront::state::AppState;

use super::{CliError, settle};
use crate::view;

/// What to do to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartIntent {
    Show,
    Add(MedicineId, Quantity),
    Set(MedicineId, u32),
    Increment(MedicineId),
    Decrement(MedicineId),
    Remove(MedicineId),
    Clear,
}

pub async fn run(state: &AppState, intent: CartIntent) -> Result<(), CliError> {
    let cart = state.cart();

    let result = match intent {
        CartIntent::Show => cart.fetch().await,
        CartIntent::Add(id, quantity) => cart.add(&id, quantity).await,
        CartIntent::Set(id, quantity) => cart.set_quantity(&id, quantity).await,
        CartIntent::Increment(id) => match cart.fetch().await {
            Ok(_) => cart.increment(&id).await,
            Err(e) => Err(e),
        },
        CartIntent::Decrement(id) => match cart.fetch().await {
            Ok(_) => cart.decrement(&id).await,
            Err(e) => Err(e),
        },
        CartIntent::Remove(id) => cart.remove(&id).await,
        CartIntent::Clear => cart.clear().await,
    };

    let updated = settle(result, cart.clear_error()).await?;
    view::emit(&view::render_cart(&updated));
    Ok(())
}
