use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use sommelier_core::config::AssistantConfig;
use sommelier_core::domain::intent::{ContextFilters, DetectedProduct, Intent, QuestionKind};
use sommelier_core::memory::ContextualMemory;
use sommelier_core::nlp::category::fuzzy_category;
use sommelier_core::nlp::normalize::{contains_phrase, prepare, product_query};
use sommelier_core::nlp::IntentExtractor;
use sommelier_db::repositories::CatalogRepository;

/// Shortest normalized brand that may be matched inside a message.
const MIN_BRAND_LEN: usize = 4;

/// Builds one message's intent from the text, the catalog and the session context.
///
/// Catalog lookups are best effort: a failing store degrades the affected field
/// to "no signal" and extraction carries on.
#[derive(Clone)]
pub struct IntentAggregator {
    extractor: IntentExtractor,
    catalog: Arc<dyn CatalogRepository>,
    category_threshold: f64,
    product_threshold: f64,
}

impl IntentAggregator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, config: &AssistantConfig) -> Self {
        Self {
            extractor: IntentExtractor::with_price_defaults(
                config.cheap_price_ceiling,
                config.premium_price_floor,
            ),
            catalog,
            category_threshold: config.category_similarity_threshold,
            product_threshold: config.product_match_threshold,
        }
    }

    pub fn extractor(&self) -> &IntentExtractor {
        &self.extractor
    }

    pub async fn process(
        &self,
        text: &str,
        memory: &mut ContextualMemory,
        now: DateTime<Utc>,
    ) -> Intent {
        let mut intent = self.extractor.extract(text);
        if intent.question == QuestionKind::Abstract {
            return intent;
        }

        if intent.category.is_none() {
            intent.category = self.catalog_category(text).await;
        }
        intent.brand = self.detect_brand(text).await;

        inherit_context(&mut intent, memory, now);

        if intent.question == QuestionKind::Provenance {
            intent.detected_product = self.detect_product(text).await;
        }

        debug!(
            event_name = "sommelier.intent.extracted",
            category = intent.category.as_deref().unwrap_or_default(),
            inherited = intent.category_inherited,
            brand = intent.brand.as_deref().unwrap_or_default(),
            searchable = intent.is_searchable(),
            "intent extracted"
        );
        intent
    }

    /// Fuzzy match against the categories actually stocked.
    pub async fn catalog_category(&self, text: &str) -> Option<String> {
        match self.catalog.distinct_categories().await {
            Ok(categories) => fuzzy_category(text, &categories, self.category_threshold),
            Err(error) => {
                warn!(event_name = "sommelier.intent.degraded", field = "category", error = %error, "category lookup failed");
                None
            }
        }
    }

    async fn detect_brand(&self, text: &str) -> Option<String> {
        let prepared = prepare(text);
        let brands = match self.catalog.distinct_brands().await {
            Ok(brands) => brands,
            Err(error) => {
                warn!(event_name = "sommelier.intent.degraded", field = "brand", error = %error, "brand lookup failed");
                return None;
            }
        };

        brands
            .into_iter()
            .filter(|brand| brand.len() >= MIN_BRAND_LEN && contains_phrase(&prepared, brand))
            .max_by_key(|brand| brand.len())
    }

    /// Single best product named in the message, if any clears the match threshold.
    pub async fn detect_product(&self, text: &str) -> Option<DetectedProduct> {
        let query = product_query(text);
        if query.is_empty() {
            return None;
        }

        match self.catalog.find_best_match(&query, self.product_threshold).await {
            Ok(found) => found.map(|product| DetectedProduct {
                id: product.id,
                origin: product.known_origin().map(str::to_string),
                name: product.display_name,
            }),
            Err(error) => {
                warn!(event_name = "sommelier.intent.degraded", field = "product", error = %error, "product lookup failed");
                None
            }
        }
    }
}

/// Gives an uncategorized refinement the remembered topic. Safe to call again after
/// later rules add a refinement of their own.
pub fn inherit_context(intent: &mut Intent, memory: &mut ContextualMemory, now: DateTime<Utc>) {
    if intent.category.is_some() || !inherits_context(intent) {
        return;
    }
    if let Some(context) = memory.recall(now) {
        merge_context(intent, context);
    }
}

/// Follow-ups that only refine ("e até 30?", "mais leve", "de 1 litro") keep the topic.
fn inherits_context(intent: &Intent) -> bool {
    intent.has_price_bound() || intent.sensory.is_some() || intent.has_volume_bound()
}

/// Fills what the message left open. Price and volume bounds move as a pair.
fn merge_context(intent: &mut Intent, context: ContextFilters) {
    if let Some(category) = context.category {
        intent.category = Some(category);
        intent.category_inherited = true;
    }
    if intent.sensory.is_none() {
        intent.sensory = context.sensory;
    }
    if intent.occasion.is_none() {
        intent.occasion = context.occasion;
    }
    if !intent.has_price_bound() {
        intent.price_min = context.price_min;
        intent.price_max = context.price_max;
    }
    if !intent.has_volume_bound() {
        intent.volume_min_ml = context.volume_min_ml;
        intent.volume_max_ml = context.volume_max_ml;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use sommelier_core::config::AssistantConfig;
    use sommelier_core::domain::intent::{ContextFilters, QuestionKind, SensoryProfile};
    use sommelier_core::domain::product::NewProduct;
    use sommelier_core::memory::ContextualMemory;
    use sommelier_db::repositories::{CatalogRepository, InMemoryCatalogRepository};

    use super::IntentAggregator;

    fn product(name: &str, category: &str, brand: &str, country: Option<&str>) -> NewProduct {
        NewProduct {
            display_name: name.to_string(),
            category: category.to_string(),
            brand: Some(brand.to_string()),
            price: Decimal::from(20),
            stock_quantity: 3,
            volume_ml: Some(750),
            country_of_origin: country.map(str::to_string),
            tasting_notes: None,
        }
    }

    async fn aggregator() -> IntentAggregator {
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        for item in [
            product("Casillero del Diablo Cabernet", "VINOS", "Concha y Toro", Some("Chile")),
            product("Jose Cuervo Especial", "TEQUILA", "Jose Cuervo", Some("Mexico")),
            product("Tanqueray London Dry", "GIN", "Tanqueray", None),
        ] {
            catalog.insert(item).await.expect("insert");
        }
        IntentAggregator::new(catalog, &AssistantConfig::default())
    }

    fn wine_context(memory: &mut ContextualMemory, at: chrono::DateTime<Utc>) {
        memory.register(
            ContextFilters {
                category: Some("VINOS".to_string()),
                price_max: Some(Decimal::from(30)),
                ..ContextFilters::default()
            },
            at,
        );
    }

    #[tokio::test]
    async fn price_only_follow_up_inherits_category() {
        let aggregator = aggregator().await;
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).single().expect("timestamp");
        let mut memory = ContextualMemory::default();
        wine_context(&mut memory, start);

        let intent = aggregator.process("e até 50 dólares?", &mut memory, start + Duration::seconds(30)).await;
        assert_eq!(intent.category.as_deref(), Some("VINOS"));
        assert!(intent.category_inherited);
        assert_eq!(intent.price_max, Some(Decimal::from(50)));
        assert!(intent.is_searchable());
    }

    #[tokio::test]
    async fn expired_context_is_not_inherited() {
        let aggregator = aggregator().await;
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).single().expect("timestamp");
        let mut memory = ContextualMemory::default();
        wine_context(&mut memory, start);

        let intent = aggregator.process("algo mais doce", &mut memory, start + Duration::seconds(301)).await;
        assert_eq!(intent.category, None);
        assert_eq!(intent.sensory, Some(SensoryProfile::Sweet));
    }

    #[tokio::test]
    async fn catalog_categories_resolve_unknown_words() {
        let aggregator = aggregator().await;
        let mut memory = ContextualMemory::default();
        let intent = aggregator.process("tem tequila até 30?", &mut memory, Utc::now()).await;
        assert_eq!(intent.category.as_deref(), Some("TEQUILA"));
    }

    #[tokio::test]
    async fn brand_mentions_fill_the_brand() {
        let aggregator = aggregator().await;
        let mut memory = ContextualMemory::default();
        let intent = aggregator.process("um gin Tanqueray pra hoje", &mut memory, Utc::now()).await;
        assert_eq!(intent.brand.as_deref(), Some("tanqueray"));
        assert_eq!(intent.category.as_deref(), Some("GIN"));
    }

    #[tokio::test]
    async fn provenance_questions_resolve_the_product() {
        let aggregator = aggregator().await;
        let mut memory = ContextualMemory::default();
        let intent = aggregator
            .process("de onde vem o Casillero del Diablo?", &mut memory, Utc::now())
            .await;
        assert_eq!(intent.question, QuestionKind::Provenance);
        let detected = intent.detected_product.expect("product detected");
        assert_eq!(detected.name, "Casillero del Diablo Cabernet");
        assert_eq!(detected.origin.as_deref(), Some("Chile"));
    }

    #[tokio::test]
    async fn abstract_questions_skip_the_catalog() {
        let aggregator = aggregator().await;
        let mut memory = ContextualMemory::default();
        wine_context(&mut memory, Utc::now());
        let intent = aggregator.process("qual o melhor whisky do mundo?", &mut memory, Utc::now()).await;
        assert_eq!(intent.question, QuestionKind::Abstract);
        assert_eq!(intent.category.as_deref(), Some("WHISKY"));
        assert!(intent.brand.is_none());
        assert!(intent.detected_product.is_none());
    }
}
