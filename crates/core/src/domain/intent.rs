use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensoryProfile {
    Dry,
    Sweet,
    Light,
    Intense,
    Bitter,
    Fruity,
    Balanced,
}

impl SensoryProfile {
    /// Portuguese label, also used as the search-text ranking keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dry => "seco",
            Self::Sweet => "doce",
            Self::Light => "suave",
            Self::Intense => "forte",
            Self::Bitter => "amargo",
            Self::Fruity => "frutado",
            Self::Balanced => "equilibrado",
        }
    }

    /// Words that mark a product's search text as fitting this profile.
    pub fn search_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Dry => &["seco", "brut", "dry"],
            Self::Sweet => &["doce", "suave", "demi sec", "moscatel"],
            Self::Light => &["suave", "leve", "light"],
            Self::Intense => &["forte", "intenso", "encorpado", "reserva"],
            Self::Bitter => &["amargo", "ipa", "bitter"],
            Self::Fruity => &["frutado", "frutas", "citrico", "aromatico"],
            Self::Balanced => &["equilibrado", "balanceado"],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occasion {
    Gift,
    Party,
    Barbecue,
    Dinner,
    Lunch,
    Meal,
    NewYear,
    Christmas,
    Birthday,
    Wedding,
    Graduation,
    CorporateParty,
    Event,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gift => "presente",
            Self::Party => "festa",
            Self::Barbecue => "churrasco",
            Self::Dinner => "jantar",
            Self::Lunch => "almoco",
            Self::Meal => "acompanhar_refeicao",
            Self::NewYear => "reveillon",
            Self::Christmas => "natal",
            Self::Birthday => "aniversario",
            Self::Wedding => "casamento",
            Self::Graduation => "formatura",
            Self::CorporateParty => "confraternizacao",
            Self::Event => "evento",
        }
    }

    /// Named celebrations that override a category carried over from context.
    pub fn is_macro_event(&self) -> bool {
        matches!(
            self,
            Self::NewYear | Self::Christmas | Self::Wedding | Self::Graduation | Self::CorporateParty
        )
    }

    pub fn scale(&self) -> Option<EventScale> {
        match self {
            Self::Dinner | Self::Wedding | Self::Christmas => Some(EventScale::Elegant),
            Self::NewYear | Self::CorporateParty | Self::Event | Self::Graduation => {
                Some(EventScale::Large)
            }
            Self::Birthday | Self::Barbecue => Some(EventScale::Medium),
            Self::Gift | Self::Party | Self::Lunch | Self::Meal => None,
        }
    }
}

/// Used only for phrasing; never a search filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScale {
    Large,
    Medium,
    Elegant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    None,
    Provenance,
    Abstract,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedProduct {
    pub id: ProductId,
    pub name: String,
    pub origin: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl PriceRange {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VolumeRange {
    pub min_ml: Option<i32>,
    pub max_ml: Option<i32>,
}

impl VolumeRange {
    pub fn is_empty(&self) -> bool {
        self.min_ml.is_none() && self.max_ml.is_none()
    }
}

/// Filterable subset of an intent, as retained by contextual memory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensory: Option<SensoryProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<Occasion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_min_ml: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_max_ml: Option<i32>,
}

impl ContextFilters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.sensory.is_none()
            && self.occasion.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.volume_min_ml.is_none()
            && self.volume_max_ml.is_none()
    }

    /// Blank strings count as no signal.
    pub fn compact(mut self) -> Self {
        self.category = self
            .category
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Intent {
    pub category: Option<String>,
    /// Set when `category` came from contextual memory rather than the message.
    pub category_inherited: bool,
    pub brand: Option<String>,
    pub sensory: Option<SensoryProfile>,
    pub occasion: Option<Occasion>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub volume_min_ml: Option<i32>,
    pub volume_max_ml: Option<i32>,
    pub question: QuestionKind,
    pub detected_product: Option<DetectedProduct>,
    pub event_scale: Option<EventScale>,
}

impl Intent {
    pub fn from_filters(filters: ContextFilters) -> Self {
        Self {
            category: filters.category,
            category_inherited: true,
            sensory: filters.sensory,
            occasion: filters.occasion,
            price_min: filters.price_min,
            price_max: filters.price_max,
            volume_min_ml: filters.volume_min_ml,
            volume_max_ml: filters.volume_max_ml,
            ..Self::default()
        }
    }

    pub fn filters(&self) -> ContextFilters {
        ContextFilters {
            category: self.category.clone(),
            sensory: self.sensory,
            occasion: self.occasion,
            price_min: self.price_min,
            price_max: self.price_max,
            volume_min_ml: self.volume_min_ml,
            volume_max_ml: self.volume_max_ml,
        }
        .compact()
    }

    pub fn has_price_bound(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some()
    }

    pub fn has_volume_bound(&self) -> bool {
        self.volume_min_ml.is_some() || self.volume_max_ml.is_some()
    }

    pub fn has_refinement(&self) -> bool {
        self.sensory.is_some()
            || self.occasion.is_some()
            || self.has_price_bound()
            || self.has_volume_bound()
    }

    /// A bare category is never enough to recommend from.
    pub fn is_searchable(&self) -> bool {
        self.category.is_some() && self.has_refinement()
    }

    pub fn has_filter(&self) -> bool {
        !self.filters().is_empty()
    }

    pub fn set_price(&mut self, range: PriceRange) {
        self.price_min = range.min;
        self.price_max = range.max;
        self.order_price_bounds();
    }

    pub fn order_price_bounds(&mut self) {
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                self.price_min = Some(max);
                self.price_max = Some(min);
            }
        }
    }

    pub fn set_volume(&mut self, range: VolumeRange) {
        self.volume_min_ml = range.min_ml;
        self.volume_max_ml = range.max_ml;
    }
}
