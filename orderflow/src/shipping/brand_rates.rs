//! Static per-brand rate cards.
//!
//! Brands can configure flat shipping rates independent of live carrier
//! quotes. The table is a persisted lookup; only `is_active` rows are served.

use crate::core::BrandRate;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory brand rate-card table.
#[derive(Debug, Default)]
pub struct BrandRateTable {
    rates: RwLock<HashMap<String, Vec<BrandRate>>>,
}

impl BrandRateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a rate row under its brand.
    pub fn upsert(&self, rate: BrandRate) {
        let mut rates = self.rates.write();
        let rows = rates.entry(rate.brand_id.clone()).or_default();
        if let Some(existing) = rows.iter_mut().find(|r| r.id == rate.id) {
            *existing = rate;
        } else {
            rows.push(rate);
        }
    }

    /// Returns only the active rates for a brand.
    #[must_use]
    pub fn active_for_brand(&self, brand_id: &str) -> Vec<BrandRate> {
        self.rates
            .read()
            .get(brand_id)
            .map(|rows| rows.iter().filter(|r| r.is_active).cloned().collect())
            .unwrap_or_default()
    }

    /// Deactivates a rate row. Returns true if the row existed.
    pub fn deactivate(&self, brand_id: &str, rate_id: &str) -> bool {
        let mut rates = self.rates.write();
        if let Some(rows) = rates.get_mut(brand_id) {
            if let Some(row) = rows.iter_mut().find(|r| r.id == rate_id) {
                row.is_active = false;
                return true;
            }
        }
        false
    }
}
