//! Direct price questions: category averages, the single cheapest or most
//! expensive label, and the price of one named product.
//!
//! Each answer leaves its category in contextual memory so that a follow-up
//! like "e até 30?" stays on the same topic.

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use sommelier_core::domain::intent::ContextFilters;
use sommelier_core::nlp::category::CategoryClassifier;
use sommelier_core::nlp::normalize::product_query;
use sommelier_core::nlp::pattern::Pattern;
use sommelier_db::repositories::{CatalogRepository, PriceOrder};

use super::{Rule, RuleOutcome, Turn};
use crate::conversation::IntentAggregator;
use crate::guardrails::mentions_explicit_price;
use crate::reply::{format_name, format_price, single_price};

const STATISTICS: &str = r"\b(media|medio|em media|promedio|em geral|normalmente|faixa de preco)\b";
const EXTREME: &str = r"\b(mais caro|mais cara|mais barato|mais barata|preco mais alto|preco mais baixo)\b";
const CHEAPEST: &str = r"\b(mais barato|mais barata|preco mais baixo)\b";
const PRODUCT_PRICE: &str = r"\b(preco|precio|quanto custa|cuanto cuesta|valor|price|custa)\b";

struct PricePatterns {
    statistics: Pattern,
    extreme: Pattern,
    cheapest: Pattern,
    product_price: Pattern,
}

fn patterns() -> &'static PricePatterns {
    static PATTERNS: OnceLock<PricePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PricePatterns {
        statistics: Pattern::new(STATISTICS),
        extreme: Pattern::new(EXTREME),
        cheapest: Pattern::new(CHEAPEST),
        product_price: Pattern::new(PRODUCT_PRICE),
    })
}

fn remember_category(turn: &mut Turn<'_>, category: &str) {
    turn.state.memory.register(
        ContextFilters { category: Some(category.to_string()), ..ContextFilters::default() },
        turn.now,
    );
}

/// "Quanto custa em média um vinho?"
pub struct PriceStatistics {
    catalog: Arc<dyn CatalogRepository>,
    aggregator: IntentAggregator,
}

impl PriceStatistics {
    pub fn new(catalog: Arc<dyn CatalogRepository>, aggregator: IntentAggregator) -> Self {
        Self { catalog, aggregator }
    }

    /// Message first, then the stocked categories, then whatever the customer was just looking at.
    async fn resolve_category(&self, turn: &mut Turn<'_>) -> Option<String> {
        if let Some(category) = CategoryClassifier::shared().classify(turn.text) {
            return Some(category);
        }
        if let Some(category) = self.aggregator.catalog_category(turn.text).await {
            return Some(category);
        }
        turn.state.memory.recall(turn.now).and_then(|context| context.category)
    }
}

#[async_trait]
impl Rule for PriceStatistics {
    fn name(&self) -> &'static str {
        "price_statistics"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        patterns().statistics.is_match(&turn.prepared)
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        let Some(category) = self.resolve_category(turn).await else {
            return Ok(RuleOutcome::framed("Você quer saber a média de qual tipo de bebida? 🍷"));
        };
        remember_category(turn, &category);

        let Some(stats) = self.catalog.price_stats(&category).await? else {
            return Ok(RuleOutcome::framed(
                "No momento não encontrei dados suficientes para calcular essa média 😕",
            ));
        };
        debug!(event_name = "sommelier.price.statistics", category = %category, count = stats.count, "price statistics");

        Ok(RuleOutcome::framed(format!(
            "Em geral, os {category} ficam entre {} e {} dólares.\nA média costuma girar em torno de {} dólares 🍷",
            format_price(stats.min),
            format_price(stats.max),
            format_price(stats.avg),
        )))
    }
}

/// "Qual o whisky mais caro?"
///
/// Without a category in the message this only fires when there is no live
/// context; otherwise "e mais barato?" is a refinement handled further down.
pub struct PriceExtreme {
    catalog: Arc<dyn CatalogRepository>,
}

impl PriceExtreme {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Rule for PriceExtreme {
    fn name(&self) -> &'static str {
        "price_extreme"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        patterns().extreme.is_match(&turn.prepared)
            && (CategoryClassifier::shared().classify(turn.text).is_some()
                || !turn.state.memory.has_valid_context(turn.now))
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        let category = CategoryClassifier::shared().classify(turn.text);
        let (order, label) = if patterns().cheapest.is_match(&turn.prepared) {
            (PriceOrder::Cheapest, "mais barato")
        } else {
            (PriceOrder::MostExpensive, "mais caro")
        };

        let Some(product) = self.catalog.price_extreme(category.as_deref(), order).await? else {
            return Ok(RuleOutcome::framed(
                "No momento não encontrei bebidas disponíveis para essa consulta 🍷",
            ));
        };
        if let Some(category) = &category {
            remember_category(turn, category);
        }

        Ok(RuleOutcome::framed(format!(
            "O {} é o {label} disponível no momento, custando {} dólares.",
            format_name(&product.display_name),
            format_price(product.price)
        )))
    }
}

/// "Quanto custa o Casillero del Diablo?"
///
/// Skipped when the message carries a numeric bound; "vinho com preço até 30"
/// is a search, not a lookup.
pub struct ProductPrice {
    catalog: Arc<dyn CatalogRepository>,
    threshold: f64,
}

impl ProductPrice {
    pub fn new(catalog: Arc<dyn CatalogRepository>, threshold: f64) -> Self {
        Self { catalog, threshold }
    }
}

#[async_trait]
impl Rule for ProductPrice {
    fn name(&self) -> &'static str {
        "product_price"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        patterns().product_price.is_match(&turn.prepared) && !mentions_explicit_price(turn.text)
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        let query = product_query(turn.text);
        let found = if query.is_empty() {
            None
        } else {
            self.catalog.find_best_match(&query, self.threshold).await?
        };

        let Some(product) = found else {
            return Ok(RuleOutcome::framed(
                "Não encontrei o preço desse produto no momento 😕 Posso te mostrar opções semelhantes?",
            ));
        };
        remember_category(turn, &product.category);
        Ok(RuleOutcome::framed(single_price(&product.display_name, product.price)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use sommelier_core::config::AssistantConfig;
    use sommelier_core::domain::intent::ContextFilters;
    use sommelier_core::domain::product::NewProduct;
    use sommelier_core::session::SessionState;
    use sommelier_db::repositories::{CatalogRepository, InMemoryCatalogRepository};

    use super::{patterns, PriceExtreme, PriceStatistics, ProductPrice};
    use crate::conversation::IntentAggregator;
    use crate::rules::{Rule, RuleOutcome, Turn};

    async fn catalog() -> Arc<InMemoryCatalogRepository> {
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        let rows = [
            ("Johnnie Walker Red Label", "WHISKY", 40, 3),
            ("Macallan 12 anos", "WHISKY", 120, 2),
            ("Chivas Regal 12", "WHISKY", 75, 4),
            ("Glenfiddich 21", "WHISKY", 300, 0),
            ("Casillero del Diablo Cabernet", "VINOS", 15, 8),
        ];
        for (name, category, price, stock) in rows {
            catalog
                .insert(NewProduct {
                    display_name: name.to_string(),
                    category: category.to_string(),
                    brand: None,
                    price: Decimal::from(price),
                    stock_quantity: stock,
                    volume_ml: Some(750),
                    country_of_origin: None,
                    tasting_notes: None,
                })
                .await
                .expect("insert");
        }
        catalog
    }

    fn text_of(outcome: RuleOutcome) -> String {
        match outcome {
            RuleOutcome::Reply { text, .. } => text,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    #[test]
    fn patterns_compile() {
        let patterns = patterns();
        assert!(patterns.statistics.is_valid());
        assert!(patterns.extreme.is_valid());
        assert!(patterns.cheapest.is_valid());
        assert!(patterns.product_price.is_valid());
    }

    #[tokio::test]
    async fn most_expensive_ignores_out_of_stock_rows() {
        let rule = PriceExtreme::new(catalog().await);
        let mut state = SessionState::default();
        let mut turn = Turn::new("whisky mais caro", &mut state, Utc::now());

        assert!(rule.matches(&turn));
        let reply = text_of(rule.handle(&mut turn).await.expect("extreme"));
        assert_eq!(reply, "O Macallan 12 Anos é o mais caro disponível no momento, custando 120,00 dólares.");
        assert!(state.memory.has_valid_context(Utc::now()));
    }

    #[tokio::test]
    async fn cheapest_without_category_waits_for_live_context() {
        let rule = PriceExtreme::new(catalog().await);
        let now = Utc::now();
        let mut state = SessionState::default();
        state.memory.register(
            ContextFilters { category: Some("VINOS".to_string()), ..ContextFilters::default() },
            now,
        );

        let turn = Turn::new("e mais barato?", &mut state, now);
        assert!(!rule.matches(&turn));

        let mut fresh = SessionState::default();
        let mut turn = Turn::new("qual o mais barato?", &mut fresh, now);
        assert!(rule.matches(&turn));
        let reply = text_of(rule.handle(&mut turn).await.expect("extreme"));
        assert!(reply.starts_with("O Casillero Del Diablo Cabernet é o mais barato"), "{reply}");
    }

    #[tokio::test]
    async fn statistics_by_category() {
        let catalog = catalog().await;
        let aggregator = IntentAggregator::new(catalog.clone(), &AssistantConfig::default());
        let rule = PriceStatistics::new(catalog, aggregator);
        let mut state = SessionState::default();
        let mut turn = Turn::new("quanto custa em média um whisky?", &mut state, Utc::now());

        assert!(rule.matches(&turn));
        let reply = text_of(rule.handle(&mut turn).await.expect("statistics"));
        assert_eq!(
            reply,
            "Em geral, os WHISKY ficam entre 40,00 e 120,00 dólares.\nA média costuma girar em torno de 78,33 dólares 🍷"
        );
    }

    #[tokio::test]
    async fn statistics_without_category_asks_which() {
        let catalog = catalog().await;
        let aggregator = IntentAggregator::new(catalog.clone(), &AssistantConfig::default());
        let rule = PriceStatistics::new(catalog, aggregator);
        let mut state = SessionState::default();
        let mut turn = Turn::new("qual o preço médio?", &mut state, Utc::now());

        let reply = text_of(rule.handle(&mut turn).await.expect("statistics"));
        assert_eq!(reply, "Você quer saber a média de qual tipo de bebida? 🍷");
    }

    #[tokio::test]
    async fn product_price_lookup() {
        let rule = ProductPrice::new(catalog().await, 0.6);
        let mut state = SessionState::default();
        let mut turn = Turn::new("quanto custa o Chivas Regal?", &mut state, Utc::now());

        assert!(rule.matches(&turn));
        let reply = text_of(rule.handle(&mut turn).await.expect("price"));
        assert_eq!(reply, "O Chivas Regal 12 custa 75,00 dólares.");

        let mut turn = Turn::new("quanto custa o Zacapa?", &mut state, Utc::now());
        let reply = text_of(rule.handle(&mut turn).await.expect("price"));
        assert!(reply.starts_with("Não encontrei o preço desse produto"));
    }

    #[tokio::test]
    async fn numeric_bounds_are_not_product_lookups() {
        let rule = ProductPrice::new(catalog().await, 0.6);
        let mut state = SessionState::default();
        let turn = Turn::new("vinho com preço até 30", &mut state, Utc::now());
        assert!(!rule.matches(&turn));
    }
}
