//! Wire payload to domain type conversion functions.

use tracing::warn;

use medistore_core::{MedicineId, OrderId, Price, Quantity, Rating, UserId};

use crate::api::types::{
    Cart, CartItem, Medicine, Order, OrderItem, Page, Pagination, Review, UserProfile,
};

use super::wire::{
    CartDto, CartItemDto, MedicineDto, MedicineRef, OrderDto, OrderItemDto, PaginationDto,
    ReviewAuthor, ReviewDto, UserDto,
};

/// Convert a wire quantity, rejecting zero and negative counts.
///
/// The per-line input limit is not applied: the server's count is authoritative.
fn convert_quantity(raw: i64) -> Option<Quantity> {
    u32::try_from(raw).ok().and_then(Quantity::nonzero)
}

// =============================================================================
// Catalog
// =============================================================================

pub fn convert_medicine(dto: MedicineDto) -> Medicine {
    Medicine {
        id: dto.id,
        name: dto.name,
        description: dto.description,
        price: Price::usd(dto.price),
        image: dto.image.map(normalize_image_path),
        average_rating: Rating::new(dto.average_rating),
        stock: dto.stock.and_then(|s| u32::try_from(s).ok()),
        category: dto.category,
    }
}

/// Pagination metadata, or a single page when the server omitted it.
pub fn convert_pagination(dto: Option<PaginationDto>, requested_page: u32) -> Pagination {
    dto.map_or(
        Pagination {
            current_page: requested_page.max(1),
            total_pages: requested_page.max(1),
            total_items: None,
        },
        |p| Pagination {
            current_page: p.current_page.max(1),
            total_pages: p.total_pages,
            total_items: p.total_items,
        },
    )
}

pub fn convert_medicine_page(
    medicines: Vec<MedicineDto>,
    pagination: Option<PaginationDto>,
    requested_page: u32,
) -> Page<Medicine> {
    Page {
        items: medicines.into_iter().map(convert_medicine).collect(),
        pagination: convert_pagination(pagination, requested_page),
    }
}

/// Uploaded image paths come back with the server's source directory and
/// Windows separators (`src\uploads\x.png`); strip both.
pub fn normalize_image_path(path: String) -> String {
    let unified = path.replace('\\', "/");
    unified
        .strip_prefix("src/")
        .map_or_else(|| unified.clone(), str::to_owned)
}

pub fn convert_review(dto: ReviewDto) -> Review {
    Review {
        id: dto.id,
        author: dto.user.and_then(ReviewAuthor::into_name),
        rating: dto.rating,
        comment: dto.comment,
        created_at: dto.created_at,
    }
}

pub fn convert_review_page(
    reviews: Vec<ReviewDto>,
    pagination: Option<PaginationDto>,
    requested_page: u32,
) -> Page<Review> {
    Page {
        items: reviews.into_iter().map(convert_review).collect(),
        pagination: convert_pagination(pagination, requested_page),
    }
}

// =============================================================================
// Cart
// =============================================================================

pub fn convert_cart(dto: Option<CartDto>) -> Cart {
    let Some(dto) = dto else {
        return Cart::empty();
    };

    Cart {
        items: dto.items.into_iter().filter_map(convert_cart_item).collect(),
        total_amount: Price::usd(dto.total_amount),
    }
}

fn convert_cart_item(dto: CartItemDto) -> Option<CartItem> {
    let Some(quantity) = convert_quantity(dto.quantity) else {
        warn!(
            medicine_id = %dto.medicine.id(),
            quantity = dto.quantity,
            "Dropping cart line with non-positive quantity"
        );
        return None;
    };

    let (medicine_id, name, image) = match dto.medicine {
        MedicineRef::Id(id) => (id, None, None),
        MedicineRef::Populated(summary) => (
            summary.id,
            summary.name,
            summary.image.map(normalize_image_path),
        ),
    };

    Some(CartItem {
        medicine_id,
        name,
        image,
        unit_price: Price::usd(dto.price),
        quantity,
    })
}

// =============================================================================
// Orders
// =============================================================================

pub fn convert_order(dto: OrderDto) -> Order {
    Order {
        id: OrderId::new(dto.id),
        order_number: dto.order_id,
        status: dto.status,
        items: dto.items.into_iter().filter_map(convert_order_item).collect(),
        delivery_address: dto.delivery_address,
        total_amount: Price::usd(dto.total_amount),
        booking_date: dto.booking_date,
        updated_at: dto.updated_at,
    }
}

fn convert_order_item(dto: OrderItemDto) -> Option<OrderItem> {
    let Some(quantity) = convert_quantity(dto.quantity) else {
        warn!(
            name = ?dto.name,
            quantity = dto.quantity,
            "Dropping order line with non-positive quantity"
        );
        return None;
    };

    let (medicine_id, populated_name): (Option<MedicineId>, Option<String>) = match dto.medicine
    {
        Some(MedicineRef::Id(id)) => (Some(id), None),
        Some(MedicineRef::Populated(summary)) => (Some(summary.id), summary.name),
        None => (None, None),
    };

    // The snapshot name wins over whatever the medicine is called today
    let name = dto
        .name
        .or(populated_name)
        .unwrap_or_else(|| "Unknown item".to_string());

    Some(OrderItem {
        medicine_id,
        name,
        price: Price::usd(dto.price),
        quantity,
    })
}

pub fn convert_order_page(
    orders: Vec<OrderDto>,
    pagination: Option<PaginationDto>,
    requested_page: u32,
) -> Page<Order> {
    Page {
        items: orders.into_iter().map(convert_order).collect(),
        pagination: convert_pagination(pagination, requested_page),
    }
}

// =============================================================================
// Account
// =============================================================================

pub fn convert_user(dto: UserDto) -> UserProfile {
    UserProfile {
        id: UserId::new(dto.id),
        name: dto.name,
        email: dto.email,
        phone: dto.phone,
        address: dto.address,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::api::client::wire::{CartBody, OrderBody, ReviewsBody};

    #[test]
    fn test_convert_cart_drops_zero_quantity_lines() {
        let body: CartBody = serde_json::from_value(json!({
            "success": true,
            "cart": {
                "items": [
                    { "medicine": "med-1", "quantity": 2, "price": 3 },
                    { "medicine": "med-2", "quantity": 0, "price": 5 }
                ],
                "totalAmount": 6
            }
        }))
        .unwrap();

        let cart = convert_cart(body.cart);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].medicine_id.as_str(), "med-1");
        assert_eq!(cart.total_amount.amount, Decimal::new(6, 0));
    }

    #[test]
    fn test_convert_cart_keeps_server_order_and_total() {
        let body: CartBody = serde_json::from_value(json!({
            "cart": {
                "items": [
                    { "medicine": { "_id": "zeta", "name": "Zinc" }, "quantity": 1, "price": 2 },
                    { "medicine": { "_id": "alpha", "name": "Aspirin" }, "quantity": 1, "price": 3 }
                ],
                "totalAmount": 4.75
            }
        }))
        .unwrap();

        let cart = convert_cart(body.cart);
        let ids: Vec<_> = cart.items.iter().map(|i| i.medicine_id.as_str()).collect();
        assert_eq!(ids, ["zeta", "alpha"]);
        // The server's total is kept even when it disagrees with the line sum
        assert_eq!(cart.total_amount.amount, Decimal::new(475, 2));
        assert_eq!(cart.estimated_total().amount, Decimal::new(5, 0));
    }

    #[test]
    fn test_missing_cart_is_empty() {
        assert_eq!(convert_cart(None), Cart::empty());
    }

    #[test]
    fn test_convert_order_prefers_snapshot_name() {
        let body: OrderBody = serde_json::from_value(json!({
            "order": {
                "_id": "o-1",
                "orderId": "ORD-1001",
                "status": "Pending",
                "items": [
                    {
                        "medicine": { "_id": "med-1", "name": "Renamed Aspirin" },
                        "name": "Aspirin",
                        "price": 4.5,
                        "quantity": 2
                    }
                ],
                "deliveryAddress": {
                    "street": "1 Main St", "city": "Springfield", "state": "IL", "zipCode": "62701"
                },
                "totalAmount": 9,
                "bookingDate": "2025-01-05T10:00:00Z"
            }
        }))
        .unwrap();

        let order = convert_order(body.order);
        assert_eq!(order.display_number(), "ORD-1001");
        assert_eq!(order.items[0].name, "Aspirin");
        assert_eq!(order.items[0].line_total().amount, Decimal::new(9, 0));
        assert_eq!(order.delivery_address.zip_code, "62701");
    }

    #[test]
    fn test_large_server_quantities_are_kept() {
        let body: CartBody = serde_json::from_value(json!({
            "cart": {
                "items": [
                    { "medicine": "bulk", "quantity": 1000, "price": 1 },
                    { "medicine": "gone", "quantity": -2, "price": 1 }
                ],
                "totalAmount": 1000
            }
        }))
        .unwrap();
        let cart = convert_cart(body.cart);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity.get(), 1000);

        let body: OrderBody = serde_json::from_value(json!({
            "order": {
                "_id": "o-2",
                "status": "Pending",
                "items": [
                    { "medicine": "bulk", "name": "Gauze", "price": 1, "quantity": 1000 },
                    { "medicine": "none", "name": "Empty", "price": 1, "quantity": 0 }
                ],
                "deliveryAddress": {
                    "street": "1 Main St", "city": "Springfield", "state": "IL", "zipCode": "62701"
                },
                "totalAmount": 1000,
                "bookingDate": "2025-01-05T10:00:00Z"
            }
        }))
        .unwrap();
        let order = convert_order(body.order);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity.get(), 1000);
        assert_eq!(order.items[0].line_total().amount, Decimal::new(1000, 0));
    }

    #[test]
    fn test_convert_review_page() {
        let body: ReviewsBody = serde_json::from_value(json!({
            "reviews": [
                {
                    "_id": "r-1",
                    "user": { "_id": "u-1", "name": "Ann" },
                    "rating": 4,
                    "comment": "Helped with my cold",
                    "createdAt": "2025-02-01T08:30:00Z"
                }
            ],
            "pagination": { "currentPage": 2, "totalPages": 3, "totalItems": 21 }
        }))
        .unwrap();

        let page = convert_review_page(body.reviews, body.pagination, 2);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.items[0].author.as_deref(), Some("Ann"));
        assert_eq!(page.items[0].rating, 4);
        assert!(page.items[0].created_at.is_some());
    }

    #[test]
    fn test_normalize_image_path() {
        assert_eq!(
            normalize_image_path("src\\uploads\\pill.png".to_string()),
            "uploads/pill.png"
        );
        assert_eq!(
            normalize_image_path("uploads/pill.png".to_string()),
            "uploads/pill.png"
        );
    }

    #[test]
    fn test_pagination_defaults_to_single_page() {
        let p = convert_pagination(None, 0);
        assert_eq!(p.current_page, 1);
        assert_eq!(p.total_pages, 1);
    }
}
