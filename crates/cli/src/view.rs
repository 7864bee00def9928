//! Plain-text rendering of store state.
//!
//! Renderers return strings; only [`emit`] writes to the terminal.

use chrono::{DateTime, Utc};

use medistore_core::Price;
use medistore_storefront::api::{Cart, Medicine, Order, Pagination, Review, UserProfile};

/// Characters kept by [`truncate`] before the ellipsis.
pub const DESCRIPTION_LIMIT: usize = 50;

/// Write rendered output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    println!("{text}");
}

/// `$12.50`
pub fn format_currency(price: &Price) -> String {
    price.display()
}

/// `Jan 5, 2025`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Cut `text` to `limit` characters, appending `...` if anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{kept}...")
}

// =============================================================================
// Catalog
// =============================================================================

pub fn render_medicine_list(items: &[Medicine], pagination: &Pagination) -> String {
    if items.is_empty() {
        return "No medicines found".to_string();
    }

    let mut lines: Vec<String> = items
        .iter()
        .map(|m| {
            let rating = m
                .average_rating
                .display()
                .map_or_else(|| "unrated".to_string(), |r| format!("{r}/5"));
            format!(
                "{:<26} {:<32} {:>10}  {}\n    {}",
                m.id.as_str(),
                truncate(&m.name, 32),
                format_currency(&m.price),
                rating,
                truncate(&m.description, DESCRIPTION_LIMIT)
            )
        })
        .collect();

    lines.push(format!(
        "Page {} of {}",
        pagination.current_page, pagination.total_pages
    ));
    lines.join("\n")
}

pub fn render_medicine(medicine: &Medicine) -> String {
    let mut lines = vec![
        medicine.name.clone(),
        format!("Price: {}", format_currency(&medicine.price)),
    ];
    if let Some(rating) = medicine.average_rating.display() {
        lines.push(format!("Rating: {rating}/5"));
    }
    if let Some(stock) = medicine.stock {
        lines.push(format!("In stock: {stock}"));
    }
    if let Some(category) = &medicine.category {
        lines.push(format!("Category: {category}"));
    }
    if !medicine.description.is_empty() {
        lines.push(String::new());
        lines.push(medicine.description.clone());
    }
    lines.join("\n")
}

pub fn render_review_list(reviews: &[Review], pagination: &Pagination) -> String {
    if reviews.is_empty() {
        return "No reviews yet".to_string();
    }

    let mut lines: Vec<String> = reviews.iter().map(render_review).collect();
    lines.push(format!(
        "Page {} of {}",
        pagination.current_page, pagination.total_pages
    ));
    lines.join("\n")
}

pub fn render_review(review: &Review) -> String {
    let author = review.author.as_deref().unwrap_or("Anonymous");
    let date = review
        .created_at
        .as_ref()
        .map(|d| format!(" on {}", format_date(d)))
        .unwrap_or_default();
    format!(
        "{}/5 by {author}{date}\n    {}",
        review.rating, review.comment
    )
}

// =============================================================================
// Cart
// =============================================================================

pub fn render_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Your cart is empty".to_string();
    }

    let mut lines: Vec<String> = cart
        .items
        .iter()
        .map(|item| {
            let label = item
                .name
                .clone()
                .unwrap_or_else(|| item.medicine_id.to_string());
            format!(
                "{:<32} {:>10} x {:<4} {:>10}",
                truncate(&label, 32),
                format_currency(&item.unit_price),
                item.quantity.get(),
                format_currency(&item.line_total())
            )
        })
        .collect();

    lines.push(format!(
        "{} item(s), total {}",
        cart.item_count(),
        format_currency(&cart.total_amount)
    ));
    lines.join("\n")
}

// =============================================================================
// Orders
// =============================================================================

pub fn render_order_list(orders: &[Order], pagination: Option<&Pagination>) -> String {
    if orders.is_empty() {
        return "No orders yet".to_string();
    }

    let mut lines: Vec<String> = orders
        .iter()
        .map(|o| {
            format!(
                "{:<26} {:<12} {:<10} {:>10}",
                o.display_number(),
                format_date(&o.booking_date),
                o.status.as_str(),
                format_currency(&o.total_amount)
            )
        })
        .collect();

    if let Some(p) = pagination {
        lines.push(format!("Page {} of {}", p.current_page, p.total_pages));
    }
    lines.join("\n")
}

pub fn render_order(order: &Order) -> String {
    let mut lines = vec![
        format!("Order {}", order.display_number()),
        format!("Placed: {}", format_date(&order.booking_date)),
        format!("Status: {}", order.status.as_str()),
        format!("Deliver to: {}", order.delivery_address),
        String::new(),
    ];
    lines.extend(order.items.iter().map(|item| {
        format!(
            "{:<32} {:>10} x {:<4} {:>10}",
            truncate(&item.name, 32),
            format_currency(&item.price),
            item.quantity.get(),
            format_currency(&item.line_total())
        )
    }));
    lines.push(format!("Total: {}", format_currency(&order.total_amount)));
    lines.join("\n")
}

// =============================================================================
// Account
// =============================================================================

pub fn render_profile(user: &UserProfile) -> String {
    let mut lines = vec![format!("{} <{}>", user.name, user.email)];
    if let Some(phone) = &user.phone {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(address) = &user.address {
        lines.push(format!("Address: {address}"));
    }
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use medistore_core::{DeliveryAddress, MedicineId, OrderId, OrderStatus, Quantity, Rating};
    use medistore_storefront::api::{CartItem, OrderItem};

    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(&Price::usd(Decimal::ONE)), "$1.00");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2025, 1, 5, 14, 30, 0).unwrap();
        assert_eq!(format_date(&date), "Jan 5, 2025");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", DESCRIPTION_LIMIT), "short");

        let long = "a".repeat(60);
        let cut = truncate(&long, DESCRIPTION_LIMIT);
        assert_eq!(cut.len(), 53);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render_cart(&Cart::empty()), "Your cart is empty");
    }

    #[test]
    fn test_render_cart_uses_server_total() {
        let cart = Cart {
            items: vec![CartItem {
                medicine_id: MedicineId::new("med-1"),
                name: Some("Aspirin".to_string()),
                image: None,
                unit_price: Price::usd(Decimal::new(250, 2)),
                quantity: Quantity::new(2).unwrap(),
            }],
            total_amount: Price::usd(Decimal::new(450, 2)),
        };
        let out = render_cart(&cart);
        assert!(out.contains("Aspirin"));
        assert!(out.ends_with("2 item(s), total $4.50"));
    }

    #[test]
    fn test_render_unrated_medicine() {
        let medicine = Medicine {
            id: MedicineId::new("med-1"),
            name: "Aspirin".to_string(),
            description: "Pain relief".to_string(),
            price: Price::usd(Decimal::new(499, 2)),
            image: None,
            average_rating: Rating::new(0.0),
            stock: Some(3),
            category: None,
        };
        let out = render_medicine(&medicine);
        assert!(!out.contains("Rating"));
        assert!(out.contains("In stock: 3"));
    }

    #[test]
    fn test_render_reviews() {
        let pagination = Pagination {
            current_page: 1,
            total_pages: 2,
            total_items: Some(6),
        };
        assert_eq!(render_review_list(&[], &pagination), "No reviews yet");

        let review = Review {
            id: "r-1".to_string(),
            author: None,
            rating: 4,
            comment: "Worked quickly".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap()),
        };
        let out = render_review_list(&[review], &pagination);
        assert!(out.starts_with("4/5 by Anonymous on Feb 1, 2025"));
        assert!(out.contains("Worked quickly"));
        assert!(out.ends_with("Page 1 of 2"));
    }

    #[test]
    fn test_render_order() {
        let order = Order {
            id: OrderId::new("o-1"),
            order_number: Some("ORD-7".to_string()),
            status: OrderStatus::Delivered,
            items: vec![OrderItem {
                medicine_id: None,
                name: "Aspirin".to_string(),
                price: Price::usd(Decimal::new(5, 0)),
                quantity: Quantity::ONE,
            }],
            delivery_address: DeliveryAddress::new("1 Main St", "Springfield", "IL", "62701"),
            total_amount: Price::usd(Decimal::new(5, 0)),
            booking_date: Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap(),
            updated_at: None,
        };
        let out = render_order(&order);
        assert!(out.starts_with("Order ORD-7"));
        assert!(out.contains("Placed: Mar 14, 2025"));
        assert!(out.contains("Status: Delivered"));
        assert!(out.ends_with("Total: $5.00"));
    }
}
