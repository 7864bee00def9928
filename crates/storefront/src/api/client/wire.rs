//! Raw request and response payloads as the storefront API sends them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use medistore_core::{DeliveryAddress, MedicineId, OrderStatus};

// =============================================================================
// Envelope
// =============================================================================

/// The fields every response carries, parsed before the resource itself.
#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    /// Some validation failures come back as a list of field errors.
    #[serde(default)]
    pub errors: Option<Vec<FieldError>>,
}

impl Status {
    /// Best available human message: `message`, else the joined field errors.
    pub fn into_message(self) -> Option<String> {
        self.message.filter(|m| !m.trim().is_empty()).or_else(|| {
            self.errors
                .filter(|e| !e.is_empty())
                .map(|errors| {
                    errors
                        .into_iter()
                        .map(|e| e.msg)
                        .collect::<Vec<_>>()
                        .join("; ")
                })
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FieldError {
    #[serde(alias = "message")]
    pub msg: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// Medicine as embedded in cart and order lines: either a bare id or a
/// populated document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MedicineRef {
    Id(MedicineId),
    Populated(MedicineSummary),
}

impl MedicineRef {
    pub const fn id(&self) -> &MedicineId {
        match self {
            Self::Id(id) => id,
            Self::Populated(summary) => &summary.id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MedicineSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: MedicineId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: MedicineId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    #[serde(alias = "page")]
    pub current_page: u32,
    #[serde(alias = "pages")]
    pub total_pages: u32,
    #[serde(default, alias = "total")]
    pub total_items: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MedicinesBody {
    pub medicines: Vec<MedicineDto>,
    #[serde(default)]
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Deserialize)]
pub struct MedicineBody {
    pub medicine: MedicineDto,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CartItemDto {
    pub medicine: MedicineRef,
    pub quantity: i64,
    pub price: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    #[serde(default)]
    pub items: Vec<CartItemDto>,
    #[serde(default)]
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CartBody {
    /// A user who never added anything may get `null` here.
    #[serde(default)]
    pub cart: Option<CartDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest<'a> {
    pub medicine_id: &'a MedicineId,
    pub quantity: u32,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderItemDto {
    #[serde(default)]
    pub medicine: Option<MedicineRef>,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItemDto>,
    pub delivery_address: DeliveryAddress,
    pub total_amount: Decimal,
    #[serde(alias = "createdAt")]
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OrderBody {
    pub order: OrderDto,
}

#[derive(Debug, Deserialize)]
pub struct OrdersBody {
    pub orders: Vec<OrderDto>,
    #[serde(default)]
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest<'a> {
    pub delivery_address: &'a DeliveryAddress,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UserDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<DeliveryAddress>,
}

#[derive(Debug, Deserialize)]
pub struct AuthBody {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserDto>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a DeliveryAddress>,
}

// =============================================================================
// Reviews
// =============================================================================

/// Review author: a populated user document or a bare id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReviewAuthor {
    Populated {
        #[serde(default)]
        name: Option<String>,
    },
    Id(IgnoredAny),
}

impl ReviewAuthor {
    pub fn into_name(self) -> Option<String> {
        match self {
            Self::Populated { name } => name,
            Self::Id(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<ReviewAuthor>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewsBody {
    pub reviews: Vec<ReviewDto>,
    #[serde(default)]
    pub pagination: Option<PaginationDto>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub review: ReviewDto,
}

#[derive(Debug, Serialize)]
pub struct ReviewRequest<'a> {
    pub rating: u8,
    pub comment: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_item_accepts_populated_medicine() {
        let dto: CartItemDto = serde_json::from_value(json!({
            "medicine": { "_id": "med-1", "name": "Aspirin", "price": 4.5 },
            "quantity": 2,
            "price": 4.5
        }))
        .unwrap();
        assert_eq!(dto.medicine.id().as_str(), "med-1");
        assert!(matches!(dto.medicine, MedicineRef::Populated(_)));
    }

    #[test]
    fn test_cart_item_accepts_bare_id() {
        let dto: CartItemDto = serde_json::from_value(json!({
            "medicine": "med-2",
            "quantity": 1,
            "price": "10.00"
        }))
        .unwrap();
        assert_eq!(dto.medicine.id().as_str(), "med-2");
        assert_eq!(dto.price, Decimal::new(10, 0));
    }

    #[test]
    fn test_null_cart_body() {
        let body: CartBody = serde_json::from_value(json!({ "success": true, "cart": null })).unwrap();
        assert!(body.cart.is_none());
    }

    #[test]
    fn test_status_prefers_message_over_field_errors() {
        let status: Status = serde_json::from_value(json!({
            "success": false,
            "message": "Insufficient stock",
            "errors": [{ "msg": "quantity invalid" }]
        }))
        .unwrap();
        assert_eq!(status.into_message().as_deref(), Some("Insufficient stock"));
    }

    #[test]
    fn test_status_joins_field_errors() {
        let status: Status = serde_json::from_value(json!({
            "errors": [{ "msg": "street is required" }, { "message": "city is required" }]
        }))
        .unwrap();
        assert_eq!(
            status.into_message().as_deref(),
            Some("street is required; city is required")
        );
    }

    #[test]
    fn test_cart_line_request_is_camel_case() {
        let id = MedicineId::new("med-1");
        let body = serde_json::to_value(CartLineRequest {
            medicine_id: &id,
            quantity: 3,
        })
        .unwrap();
        assert_eq!(body, json!({ "medicineId": "med-1", "quantity": 3 }));
    }

    #[test]
    fn test_review_author_populated_or_id() {
        let body: ReviewsBody = serde_json::from_value(json!({
            "success": true,
            "reviews": [
                { "_id": "r-1", "user": { "_id": "u-1", "name": "Ann" }, "rating": 5, "comment": "Great" },
                { "_id": "r-2", "user": "u-2", "rating": 3 }
            ]
        }))
        .unwrap();
        let mut reviews = body.reviews.into_iter();
        let first = reviews.next().unwrap();
        assert_eq!(first.user.and_then(ReviewAuthor::into_name).as_deref(), Some("Ann"));
        let second = reviews.next().unwrap();
        assert_eq!(second.user.and_then(ReviewAuthor::into_name), None);
        assert_eq!(second.comment, "");
    }

    #[test]
    fn test_update_profile_request_skips_unset_fields() {
        let body = serde_json::to_value(UpdateProfileRequest {
            name: None,
            phone: Some("555-0100"),
            address: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "phone": "555-0100" }));
    }
}
