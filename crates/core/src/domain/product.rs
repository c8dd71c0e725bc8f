use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::nlp::normalize::normalize;

pub const MAX_ORIGIN_LEN: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub display_name: String,
    pub category: String,
    pub brand: Option<String>,
    pub brand_normalized: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub volume_ml: Option<i32>,
    pub country_of_origin: Option<String>,
    pub origin_summary: Option<String>,
    pub search_text: String,
}

impl Product {
    /// Only stocked rows may be recommended or quoted.
    pub fn is_available(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn known_origin(&self) -> Option<&str> {
        self.country_of_origin
            .as_deref()
            .map(str::trim)
            .filter(|origin| is_valid_origin(origin))
    }
}

pub fn is_valid_origin(origin: &str) -> bool {
    let origin = origin.trim();
    !origin.is_empty()
        && origin.chars().count() <= MAX_ORIGIN_LEN
        && !matches!(origin.to_lowercase().as_str(), "desconhecido" | "unknown" | "desconocido")
}

/// A catalog row before the store assigns its id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub display_name: String,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i64,
    #[serde(default)]
    pub volume_ml: Option<i32>,
    #[serde(default)]
    pub country_of_origin: Option<String>,
    /// Free descriptors ("tinto seco", "brut") that feed ranking but not display.
    #[serde(default)]
    pub tasting_notes: Option<String>,
}

impl NewProduct {
    pub fn brand_normalized(&self) -> Option<String> {
        self.brand.as_deref().map(normalize).filter(|brand| !brand.is_empty())
    }

    pub fn search_text(&self) -> String {
        let parts = [
            Some(self.display_name.as_str()),
            self.brand.as_deref(),
            Some(self.category.as_str()),
            self.tasting_notes.as_deref(),
        ];
        normalize(&parts.into_iter().flatten().collect::<Vec<_>>().join(" "))
    }

    pub fn into_product(self, id: ProductId) -> Product {
        let brand_normalized = self.brand_normalized();
        let search_text = self.search_text();
        let country_of_origin = self
            .country_of_origin
            .filter(|origin| is_valid_origin(origin))
            .map(|origin| origin.trim().to_string());
        Product {
            id,
            display_name: self.display_name,
            category: self.category,
            brand: self.brand,
            brand_normalized,
            price: self.price,
            stock_quantity: self.stock_quantity,
            volume_ml: self.volume_ml,
            country_of_origin,
            origin_summary: None,
            search_text,
        }
    }
}

/// Compact view of a product handed to reply formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub display_name: String,
    pub category: String,
    pub price: Decimal,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            display_name: product.display_name.clone(),
            category: product.category.clone(),
            price: product.price,
        }
    }
}
