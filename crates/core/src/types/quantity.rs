//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero is not a valid line quantity; the line must be removed instead.
    #[error("quantity must be at least 1")]
    Zero,
    /// The requested quantity exceeds the per-line maximum.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Maximum allowed quantity.
        max: u32,
    },
}

/// A strictly positive item quantity.
///
/// A cart line never holds a zero quantity: decrementing past one yields
/// `None` and the caller is expected to remove the line. [`Quantity::MAX`]
/// bounds what a user may ask for; counts reported by the server are taken
/// as they are through [`Quantity::nonzero`].
///
/// ```
/// use medistore_core::{Quantity, QuantityError};
///
/// assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
/// let two = Quantity::new(2).unwrap();
/// assert_eq!(two.decrement().map(Quantity::get), Some(1));
/// assert_eq!(Quantity::ONE.decrement(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// The smallest valid quantity.
    pub const ONE: Self = Self(1);

    /// Maximum quantity accepted for a single line.
    pub const MAX: u32 = 999;

    /// Create a quantity, rejecting zero and values above [`Self::MAX`].
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] or [`QuantityError::TooLarge`].
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::Zero);
        }
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(value))
    }

    /// Wrap a count that is only required to be positive.
    ///
    /// Used for quantities the server already holds, which are not subject to
    /// the per-line input limit.
    #[must_use]
    pub const fn nonzero(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// One more than this quantity, or `None` at the maximum.
    #[must_use]
    pub const fn increment(self) -> Option<Self> {
        if self.0 >= Self::MAX {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// One less than this quantity, or `None` when that would reach zero.
    #[must_use]
    pub const fn decrement(self) -> Option<Self> {
        if self.0 <= 1 {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Self::nonzero(value).ok_or_else(|| serde::de::Error::custom(QuantityError::Zero))
    }
}
