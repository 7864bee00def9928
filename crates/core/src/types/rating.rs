//! Average review rating for a catalog entry.

use serde::{Deserialize, Serialize};

/// Average customer rating on a 1-5 scale.
///
/// The API reports `0` for entries that have never been reviewed, so zero
/// means "unrated" rather than "rated zero".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    /// Wrap a raw average as reported by the API.
    #[must_use]
    pub const fn new(average: f64) -> Self {
        Self(average)
    }

    /// The average, or `None` when the entry is unrated.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        (self.0 > 0.0).then_some(self.0)
    }

    /// Whether the entry has any reviews.
    #[must_use]
    pub fn is_rated(self) -> bool {
        self.value().is_some()
    }

    /// One-decimal display string, or `None` when unrated.
    #[must_use]
    pub fn display(self) -> Option<String> {
        self.value().map(|v| format!("{v:.1}"))
    }
}
