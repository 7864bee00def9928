//! Catalog query store.
//!
//! Read-only mirror of one catalog page plus the entry currently being viewed.
//! Changing the search term always restarts pagination at page 1.

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use medistore_core::{MedicineId, Price};

use crate::api::{CatalogQuery, Medicine, Page, StorefrontApi};
use crate::config::MutationOrdering;
use crate::error::StoreError;

use super::{Lifecycle, Mirror, RequestState};

const LIST_FAILED: &str = "Failed to fetch medicines";
const DETAIL_FAILED: &str = "Failed to fetch medicine";

/// Client-side price filter applied to the page already fetched.
///
/// This narrows the current page only; entries on other pages are never
/// considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceBucket {
    /// No filtering.
    #[default]
    Any,
    /// Strictly below the bound.
    Under(Decimal),
    /// Between the bounds, both inclusive.
    Between(Decimal, Decimal),
    /// Strictly above the bound.
    Over(Decimal),
}

impl PriceBucket {
    /// Build an inclusive range from optional lower and upper bounds.
    #[must_use]
    pub fn from_bounds(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        if min.is_none() && max.is_none() {
            return Self::Any;
        }
        Self::Between(min.unwrap_or(Decimal::ZERO), max.unwrap_or(Decimal::MAX))
    }

    #[must_use]
    pub fn contains(&self, price: &Price) -> bool {
        let amount = price.amount;
        match *self {
            Self::Any => true,
            Self::Under(max) => amount < max,
            Self::Between(min, max) => amount >= min && amount <= max,
            Self::Over(min) => amount > min,
        }
    }
}

struct CatalogSlice {
    page: Option<Page<Medicine>>,
    /// Search term of the most recently issued listing query; `None` until
    /// the first query, `Some(None)` after an unfiltered one.
    last_search: Option<Option<String>>,
    current: Option<Medicine>,
    lifecycle: Lifecycle,
}

/// Mirror of the catalog listing and the currently viewed entry.
pub struct CatalogStore<A> {
    api: A,
    default_page_size: u32,
    slice: RwLock<CatalogSlice>,
}

impl<A: StorefrontApi> CatalogStore<A> {
    pub fn new(api: A, default_page_size: u32, ordering: MutationOrdering) -> Self {
        Self {
            api,
            default_page_size,
            slice: RwLock::new(CatalogSlice {
                page: None,
                last_search: None,
                current: None,
                lifecycle: Lifecycle::new(ordering),
            }),
        }
    }

    /// Fetch a catalog page.
    ///
    /// If the search term differs from the previous query's, the requested
    /// page is ignored and page 1 is fetched instead. The first query of a
    /// store has nothing to differ from and keeps its page.
    ///
    /// # Errors
    ///
    /// Returns the categorized failure; the current page is left untouched.
    #[instrument(skip(self), fields(page = query.page, search = query.search_term()))]
    pub async fn query(&self, query: CatalogQuery) -> Result<Page<Medicine>, StoreError> {
        let search = query.search_term().map(str::to_string);

        let (ticket, effective) = {
            let mut slice = self.slice.write().await;
            let changed = slice
                .last_search
                .as_ref()
                .is_some_and(|previous| *previous != search);
            let page = if changed {
                if query.page > 1 {
                    debug!("Search term changed, restarting at page 1");
                }
                1
            } else {
                query.page.max(1)
            };
            slice.last_search = Some(search.clone());

            let effective = CatalogQuery {
                page,
                page_size: Some(query.page_size.unwrap_or(self.default_page_size)),
                search,
            };
            (slice.lifecycle.begin(Mirror::Listing), effective)
        };

        let result = self.api.get_medicines(&effective).await;

        let mut slice = self.slice.write().await;
        match result {
            Ok(page) => {
                if slice.lifecycle.succeed(ticket) {
                    slice.page = Some(page.clone());
                    Ok(page)
                } else {
                    warn!("Dropping stale catalog response");
                    Ok(slice.page.clone().unwrap_or(page))
                }
            }
            Err(e) => {
                let error = StoreError::from_api(e, LIST_FAILED);
                warn!(kind = %error.kind, error = %error, "Catalog query failed");
                slice.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }

    /// Move to another page of the current search.
    ///
    /// # Errors
    ///
    /// Same as [`query`](Self::query).
    pub async fn change_page(&self, page: u32) -> Result<Page<Medicine>, StoreError> {
        let search = self.slice.read().await.last_search.clone().flatten();
        let query = CatalogQuery {
            page,
            page_size: None,
            search,
        };
        self.query(query).await
    }

    /// Fetch one entry and make it the current one.
    ///
    /// # Errors
    ///
    /// Returns a not-found failure if the entry no longer exists, otherwise
    /// the categorized failure. The current entry is left untouched.
    #[instrument(skip(self), fields(medicine_id = %id))]
    pub async fn fetch_medicine(&self, id: &MedicineId) -> Result<Medicine, StoreError> {
        let ticket = self.slice.write().await.lifecycle.begin(Mirror::Entry);

        let result = self.api.get_medicine(id).await;

        let mut slice = self.slice.write().await;
        match result {
            Ok(medicine) => {
                if slice.lifecycle.succeed(ticket) {
                    slice.current = Some(medicine.clone());
                } else {
                    warn!("Dropping stale catalog entry response");
                }
                Ok(medicine)
            }
            Err(e) => {
                let error = StoreError::from_api(e, DETAIL_FAILED);
                warn!(kind = %error.kind, error = %error, "Catalog entry fetch failed");
                slice.lifecycle.fail(ticket, error.clone());
                Err(error)
            }
        }
    }

    /// Forget the currently viewed entry.
    pub async fn clear_current(&self) {
        self.slice.write().await.current = None;
    }

    /// Entries of the current page whose price falls in `bucket`.
    pub async fn filter_current_page(&self, bucket: PriceBucket) -> Vec<Medicine> {
        self.slice
            .read()
            .await
            .page
            .as_ref()
            .map(|page| {
                page.items
                    .iter()
                    .filter(|m| bucket.contains(&m.price))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn page(&self) -> Option<Page<Medicine>> {
        self.slice.read().await.page.clone()
    }

    pub async fn current(&self) -> Option<Medicine> {
        self.slice.read().await.current.clone()
    }

    /// Search term of the last issued query.
    pub async fn search_term(&self) -> Option<String> {
        self.slice.read().await.last_search.clone().flatten()
    }

    pub async fn request_state(&self) -> RequestState {
        self.slice.read().await.lifecycle.state()
    }

    /// Dismiss the recorded error.
    pub async fn clear_error(&self) {
        self.slice.write().await.lifecycle.clear_error();
    }
}
