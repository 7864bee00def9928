//! `medistore catalog ...`

use rust_decimal::Decimal;

use medistore_core::MedicineId;
use medistore_storefront::api::{CatalogQuery, NewReview};
use medistore_storefront::error::StoreError;
use medistore_storefront::state::AppState;
use medistore_storefront::store::PriceBucket;

use super::{CliError, settle};
use crate::view;

/// List a catalog page, optionally narrowed to a price range.
///
/// The price range only filters the fetched page.
pub async fn list(
    state: &AppState,
    page: u32,
    search: Option<String>,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Result<(), CliError> {
    let catalog = state.catalog();
    let query = CatalogQuery {
        page,
        page_size: None,
        search,
    };

    let result = catalog.query(query).await;
    let fetched = settle(result, catalog.clear_error()).await?;

    let bucket = PriceBucket::from_bounds(min, max);
    let items = catalog.filter_current_page(bucket).await;
    view::emit(&view::render_medicine_list(&items, &fetched.pagination));
    Ok(())
}

/// Show one catalog entry.
pub async fn show(state: &AppState, id: &str) -> Result<(), CliError> {
    let catalog = state.catalog();
    let result = catalog.fetch_medicine(&MedicineId::new(id)).await;
    let medicine = settle(result, catalog.clear_error()).await?;

    view::emit(&view::render_medicine(&medicine));
    Ok(())
}

/// List reviews of one catalog entry.
pub async fn reviews(state: &AppState, id: &str, page: u32) -> Result<(), CliError> {
    let page = state.reviews(&MedicineId::new(id), page).await?;
    view::emit(&view::render_review_list(&page.items, &page.pagination));
    Ok(())
}

/// Review one catalog entry.
pub async fn review(state: &AppState, id: &str, rating: u8, comment: &str) -> Result<(), CliError> {
    let review = NewReview::new(rating, comment).map_err(StoreError::from)?;
    let added = state.add_review(&MedicineId::new(id), &review).await?;
    view::emit(&format!("Review added\n{}", view::render_review(&added)));
    Ok(())
}
