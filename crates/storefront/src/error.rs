//! Categorized failures surfaced by the store slices.
//!
//! Every store operation returns `Result<T, StoreError>` and records the same
//! error in its slice. The view layer only ever sees a [`FailureKind`] plus a
//! message that is safe to show to a user.

use std::fmt;

use thiserror::Error;

use medistore_core::{AddressError, QuantityError};

use crate::api::{ApiError, ReviewError};

pub const LOGIN_REQUIRED: &str = "Please login to continue";
pub const EMPTY_CART: &str = "Your cart is empty";
pub const ORDER_IN_PROGRESS: &str = "An order is already being placed";

/// Failure categories the view layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No session; the view should prompt for login.
    Unauthenticated,
    /// The server (or a local check) rejected the input.
    Validation,
    /// The medicine or order no longer exists.
    NotFound,
    /// Network failure, server failure or an unreadable response.
    Transport,
    /// The server asked us to slow down.
    RateLimited,
    /// Checkout was attempted with nothing in the cart.
    EmptyCart,
    /// The same one-shot operation is already in flight.
    Busy,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Validation => "validation",
            Self::NotFound => "not found",
            Self::Transport => "transport",
            Self::RateLimited => "rate limited",
            Self::EmptyCart => "empty cart",
            Self::Busy => "busy",
        };
        f.write_str(label)
    }
}

/// A failure recorded in a slice, with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: FailureKind,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(FailureKind::Unauthenticated, LOGIN_REQUIRED)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    #[must_use]
    pub fn empty_cart() -> Self {
        Self::new(FailureKind::EmptyCart, EMPTY_CART)
    }

    #[must_use]
    pub fn busy() -> Self {
        Self::new(FailureKind::Busy, ORDER_IN_PROGRESS)
    }

    /// Categorize an API failure.
    ///
    /// Validation and not-found messages are passed through verbatim.
    /// Transport failures use the server's message when it sent one and
    /// `fallback` otherwise, so raw transport errors never reach the user.
    #[must_use]
    pub fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Unauthenticated => Self::unauthenticated(),
            ApiError::NotFound(message) => Self::not_found(message),
            ApiError::Validation(message) => Self::validation(message),
            ApiError::RateLimited(seconds) => Self::new(
                FailureKind::RateLimited,
                format!("Too many requests, please try again in {seconds} seconds"),
            ),
            ApiError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Self::new(FailureKind::Transport, message),
            ApiError::Http(_)
            | ApiError::Parse(_)
            | ApiError::Server { .. }
            | ApiError::InvalidBaseUrl(_) => Self::new(FailureKind::Transport, fallback),
        }
    }

    /// Whether the view should send the user to the login screen.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        self.kind == FailureKind::Unauthenticated
    }
}

impl From<AddressError> for StoreError {
    fn from(err: AddressError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<QuantityError> for StoreError {
    fn from(err: QuantityError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<ReviewError> for StoreError {
    fn from(err: ReviewError) -> Self {
        Self::validation(err.to_string())
    }
}
