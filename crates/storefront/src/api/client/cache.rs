//! In-memory cache for catalog entry details.
//!
//! Only single-entry lookups are cached. Listings and anything under
//! `/user/*` always go to the server.

use std::time::Duration;

use moka::future::Cache;

use medistore_core::MedicineId;

use crate::api::types::Medicine;

const MAX_ENTRIES: u64 = 1000;

/// Catalog entry cache keyed by medicine id.
#[derive(Clone)]
pub struct CatalogCache {
    entries: Cache<MedicineId, Medicine>,
}

impl CatalogCache {
    /// Build a cache with the given TTL, or `None` when the TTL is zero.
    pub fn with_ttl(ttl: Duration) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }

        Some(Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        })
    }

    pub async fn get(&self, id: &MedicineId) -> Option<Medicine> {
        self.entries.get(id).await
    }

    pub async fn insert(&self, medicine: Medicine) {
        self.entries.insert(medicine.id.clone(), medicine).await;
    }

    pub async fn invalidate(&self, id: &MedicineId) {
        self.entries.invalidate(id).await;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use medistore_core::{Price, Rating};

    use super::*;

    fn medicine(id: &str) -> Medicine {
        Medicine {
            id: MedicineId::new(id),
            name: "Aspirin".to_string(),
            description: String::new(),
            price: Price::usd(Decimal::new(499, 2)),
            image: None,
            average_rating: Rating::new(0.0),
            stock: None,
            category: None,
        }
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        assert!(CatalogCache::with_ttl(Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn test_insert_get_invalidate() {
        let Some(cache) = CatalogCache::with_ttl(Duration::from_secs(60)) else {
            panic!("cache should be enabled");
        };
        let id = MedicineId::new("med-1");

        cache.insert(medicine("med-1")).await;
        assert_eq!(cache.get(&id).await.map(|m| m.name), Some("Aspirin".to_string()));

        cache.invalidate(&id).await;
        assert!(cache.get(&id).await.is_none());
    }
}
