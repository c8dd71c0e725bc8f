//! Pattern-based extraction over noisy, speech-transcribed Portuguese/Spanish.
//!
//! Every extractor here is a pure function of the message text. Catalog-aware
//! steps (fuzzy category fallback, brand and product lookup) live with the
//! agent, which owns the store handle.

pub mod category;
pub mod normalize;
pub mod occasion;
pub mod pattern;
pub mod price;
pub mod questions;
pub mod sensory;
pub mod similarity;
pub mod volume;

use rust_decimal::Decimal;

use crate::domain::intent::{Intent, QuestionKind};
use category::CategoryClassifier;
use occasion::extract_occasion;
use price::PriceExtractor;
use questions::{is_abstract_question, is_provenance_question};
use sensory::extract_sensory;
use volume::extract_volume;

#[derive(Clone, Debug, Default)]
pub struct IntentExtractor {
    price: PriceExtractor,
}

impl IntentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price_defaults(cheap_ceiling: Decimal, premium_floor: Decimal) -> Self {
        Self { price: PriceExtractor::new(cheap_ceiling, premium_floor) }
    }

    pub fn price_extractor(&self) -> &PriceExtractor {
        &self.price
    }

    /// Builds the per-message intent without consulting the catalog or session.
    ///
    /// Abstract questions short-circuit: only an informational category is kept.
    pub fn extract(&self, text: &str) -> Intent {
        let classifier = CategoryClassifier::shared();

        if is_abstract_question(text) {
            return Intent {
                category: classifier.classify(text),
                question: QuestionKind::Abstract,
                ..Intent::default()
            };
        }

        let mut intent = Intent {
            category: classifier.classify(text),
            sensory: extract_sensory(text),
            occasion: extract_occasion(text),
            ..Intent::default()
        };
        if is_provenance_question(text) {
            intent.question = QuestionKind::Provenance;
        }
        intent.set_price(self.price.extract(text));
        intent.set_volume(extract_volume(text));
        intent
    }
}
