use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Price-bearing product record as served by the catalog service
/// (`GET /products/{id}?details=true`).
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    /// Base unit price (per litre).
    pub price_per_litre: f64,
    /// Overrides the base price when present.
    pub selling_price: Option<f64>,
    /// Pre-discount reference price, shown struck through.
    pub compare_at_price: Option<f64>,
    /// Display unit label, e.g. "/ litre".
    #[serde(default)]
    pub suffix_after_price: String,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

/// A purchasable size/packaging option of a product, with its own absolute
/// price or a multiplier on the product's effective base price.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub id: i32,
    pub size: String,
    pub price_multiplier: f64,
    pub price: Option<f64>,
    pub is_available: bool,
}

impl Product {
    /// Effective base price: `selling_price` when set, else `price_per_litre`.
    pub fn effective_base_price(&self) -> f64 {
        self.selling_price.unwrap_or(self.price_per_litre)
    }

    /// Reference price used for savings: `compare_at_price` when set, else
    /// `price_per_litre`.
    pub fn compare_base_price(&self) -> f64 {
        self.compare_at_price.unwrap_or(self.price_per_litre)
    }

    pub fn variation(&self, variation_id: Option<i32>) -> Option<&Variation> {
        let id = variation_id?;
        self.variations.iter().find(|v| v.id == id)
    }

    /// Unit price for one variation (or the bare product when `variation` is
    /// `None`): the variation's absolute price when set, else the effective
    /// base price scaled by its multiplier.
    pub fn unit_price(&self, variation: Option<&Variation>) -> f64 {
        match variation {
            Some(v) => v
                .price
                .unwrap_or(self.effective_base_price() * v.price_multiplier),
            None => self.effective_base_price(),
        }
    }
}
