//! Domain types for the Medistore storefront API.
//!
//! These types provide a clean, ergonomic API separate from the raw wire
//! payloads the server returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medistore_core::{
    DeliveryAddress, Email, MedicineId, OrderId, OrderStatus, Price, Quantity, Rating, UserId,
};

// =============================================================================
// Catalog Types
// =============================================================================

/// A catalog entry. Read-only from the client's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Image path relative to the API host, if one was uploaded.
    pub image: Option<String>,
    pub average_rating: Rating,
    /// Units in stock, when the server reports it.
    pub stock: Option<u32>,
    pub category: Option<String>,
}

/// Pagination metadata returned with list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number of the returned page.
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: Option<u64>,
}

impl Pagination {
    /// Whether a page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Parameters for a catalog listing.
///
/// `page` is 1-based. An empty or whitespace-only search term is treated as
/// no search at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub page: u32,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
            search: None,
        }
    }
}

impl CatalogQuery {
    /// First page filtered by `term`.
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Same query, different page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Same query, explicit page size.
    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// The search term with surrounding whitespace removed, if non-empty.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// A line in the cart.
///
/// The quantity is always at least one; the server never returns zero-quantity
/// lines to the client (they are dropped during conversion if it does).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub medicine_id: MedicineId,
    /// Display name, when the server populated the medicine reference.
    pub name: Option<String>,
    pub image: Option<String>,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// The server's view of the user's cart.
///
/// `items` keep the order the server returned them in. `total_amount` is the
/// server's figure; [`estimated_total`](Self::estimated_total) is only a
/// display-time estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total_amount: Price,
}

impl Cart {
    /// An empty cart with a zero total.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line for a medicine.
    #[must_use]
    pub fn item(&self, medicine_id: &MedicineId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.medicine_id == medicine_id)
    }

    /// Total number of units across all lines (for a cart badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity.get()).sum()
    }

    /// Client-side sum of line totals, for immediate display only.
    #[must_use]
    pub fn estimated_total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A line captured when the order was placed.
///
/// Name and price are a snapshot and never follow later catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub medicine_id: Option<MedicineId>,
    pub name: String,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderItem {
    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing order number, when the server assigns one.
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub total_amount: Price,
    pub booking_date: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// The label shown to users: the order number if present, else the id.
    #[must_use]
    pub fn display_number(&self) -> &str {
        self.order_number.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

// =============================================================================
// Account Types
// =============================================================================

/// The signed-in user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<DeliveryAddress>,
}

/// Data for a new account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: secrecy::SecretString,
    pub phone: Option<String>,
}

/// Profile fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<DeliveryAddress>,
}

impl ProfileUpdate {
    /// Whether no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

// =============================================================================
// Review Types
// =============================================================================

/// A customer review of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    /// Reviewer's name, when the server populates it.
    pub author: Option<String>,
    /// Stars, 1 to 5.
    pub rating: u8,
    pub comment: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Errors rejecting a review before it is sent.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Rating must be between 1 and 5")]
    Rating,
    #[error("Comment is required")]
    EmptyComment,
}

/// A review about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    rating: u8,
    comment: String,
}

impl NewReview {
    /// Highest star rating.
    pub const MAX_RATING: u8 = 5;

    /// Validate a rating and comment. The comment is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Rating`] outside 1 to 5 and
    /// [`ReviewError::EmptyComment`] for a blank comment.
    pub fn new(rating: u8, comment: &str) -> Result<Self, ReviewError> {
        if !(1..=Self::MAX_RATING).contains(&rating) {
            return Err(ReviewError::Rating);
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }
        Ok(Self {
            rating,
            comment: comment.to_string(),
        })
    }

    #[must_use]
    pub const fn rating(&self) -> u8 {
        self.rating
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem {
            medicine_id: MedicineId::new(id),
            name: None,
            image: None,
            unit_price: Price::usd(Decimal::new(cents, 2)),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[test]
    fn test_estimated_total_sums_lines() {
        let cart = Cart {
            items: vec![item("a", 250, 2), item("b", 1000, 1)],
            total_amount: Price::zero(),
        };
        assert_eq!(cart.estimated_total().amount, Decimal::new(15, 0));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_item_lookup() {
        let cart = Cart {
            items: vec![item("a", 100, 1)],
            total_amount: Price::usd(Decimal::ONE),
        };
        assert!(cart.item(&MedicineId::new("a")).is_some());
        assert!(cart.item(&MedicineId::new("z")).is_none());
    }

    #[test]
    fn test_search_term_ignores_blank() {
        assert_eq!(CatalogQuery::search("   ").search_term(), None);
        assert_eq!(
            CatalogQuery::search(" aspirin ").search_term(),
            Some("aspirin")
        );
    }

    #[test]
    fn test_pagination_navigation() {
        let p = Pagination {
            current_page: 1,
            total_pages: 3,
            total_items: None,
        };
        assert!(p.has_next());
        assert!(!p.has_previous());
    }

    #[test]
    fn test_new_review_validation() {
        assert_eq!(NewReview::new(0, "fine"), Err(ReviewError::Rating));
        assert_eq!(NewReview::new(6, "fine"), Err(ReviewError::Rating));
        assert_eq!(NewReview::new(4, "   "), Err(ReviewError::EmptyComment));

        let review = NewReview::new(5, "  Works fast ").unwrap();
        assert_eq!(review.rating(), 5);
        assert_eq!(review.comment(), "Works fast");
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("555-0100".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
