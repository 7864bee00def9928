//! Core types for Medistore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod rating;
pub mod status;

pub use address::{AddressError, DeliveryAddress};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use quantity::{Quantity, QuantityError};
pub use rating::Rating;
pub use status::*;
