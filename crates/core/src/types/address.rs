//! Delivery address captured at checkout.

use serde::{Deserialize, Serialize};

/// Errors raised by [`DeliveryAddress::validate`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Where an order is shipped.
///
/// Every field is required. The server is still the authority on whether an
/// address is acceptable; [`validate`](Self::validate) only catches blanks
/// before a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl DeliveryAddress {
    /// Build an address, trimming each field.
    #[must_use]
    pub fn new(street: &str, city: &str, state: &str, zip_code: &str) -> Self {
        Self {
            street: street.trim().to_owned(),
            city: city.trim().to_owned(),
            state: state.trim().to_owned(),
            zip_code: zip_code.trim().to_owned(),
        }
    }

    /// Check that no required field is blank.
    ///
    /// # Errors
    ///
    /// Returns the first blank field, in form order.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("Street address", &self.street),
            ("City", &self.city),
            ("State", &self.state),
            ("Zip code", &self.zip_code),
        ];

        fields
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map_or(Ok(()), |(name, _)| Err(AddressError::MissingField(name)))
    }
}

impl std::fmt::Display for DeliveryAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {} {}",
            self.street, self.city, self.state, self.zip_code
        )
    }
}
