use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sommelier_agent::llm::{GuardedLlm, LlmClient};
use sommelier_agent::reply::NO_RESULTS;
use sommelier_agent::rules::CLARIFY_PREFERENCE;
use sommelier_agent::Sommelier;
use sommelier_core::config::AssistantConfig;
use sommelier_core::domain::product::{NewProduct, Product, ProductId};
use sommelier_core::knowledge::fixed_answer;
use sommelier_core::session::SessionState;
use sommelier_db::repositories::{
    CatalogQuery, CatalogRepository, InMemoryCatalogRepository, InMemoryInteractionRepository,
    InteractionRepository, PriceOrder, PriceStats, RepositoryError,
};

/// Delegates to an in-memory catalog and counts every call. Brand and category
/// listings are also counted on their own.
#[derive(Default)]
struct CountingCatalog {
    inner: InMemoryCatalogRepository,
    calls: AtomicUsize,
    vocabulary_calls: AtomicUsize,
}

impl CountingCatalog {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vocabulary_calls(&self) -> usize {
        self.vocabulary_calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn tick_vocabulary(&self) {
        self.tick();
        self.vocabulary_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogRepository for CountingCatalog {
    async fn insert(&self, product: NewProduct) -> Result<ProductId, RepositoryError> {
        self.inner.insert(product).await
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.tick();
        self.inner.find_by_id(id).await
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        self.tick();
        self.inner.search(query).await
    }

    async fn price_stats(&self, category: &str) -> Result<Option<PriceStats>, RepositoryError> {
        self.tick();
        self.inner.price_stats(category).await
    }

    async fn price_extreme(
        &self,
        category: Option<&str>,
        order: PriceOrder,
    ) -> Result<Option<Product>, RepositoryError> {
        self.tick();
        self.inner.price_extreme(category, order).await
    }

    async fn find_best_match(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<Option<Product>, RepositoryError> {
        self.tick();
        self.inner.find_best_match(query, threshold).await
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
        self.tick_vocabulary();
        self.inner.distinct_categories().await
    }

    async fn distinct_brands(&self) -> Result<Vec<String>, RepositoryError> {
        self.tick_vocabulary();
        self.inner.distinct_brands().await
    }

    async fn update_origin(
        &self,
        id: ProductId,
        country: &str,
        summary: Option<&str>,
    ) -> Result<(), RepositoryError> {
        self.tick();
        self.inner.update_origin(id, country, summary).await
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        self.tick();
        self.inner.count().await
    }
}

#[derive(Default)]
struct CountingLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for CountingLlm {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Texto gerado.".to_string())
    }
}

fn product(name: &str, category: &str, price: i64, stock: i64) -> NewProduct {
    NewProduct {
        display_name: name.to_string(),
        category: category.to_string(),
        brand: None,
        price: Decimal::from(price),
        stock_quantity: stock,
        volume_ml: Some(750),
        country_of_origin: None,
        tasting_notes: None,
    }
}

async fn catalog(products: Vec<NewProduct>) -> Arc<CountingCatalog> {
    let catalog = Arc::new(CountingCatalog::default());
    for item in products {
        catalog.insert(item).await.expect("insert product");
    }
    catalog
}

fn assistant(catalog: Arc<CountingCatalog>) -> Sommelier {
    Sommelier::new(catalog, GuardedLlm::disabled(), AssistantConfig::default())
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).expect("timestamp").with_timezone(&Utc)
}

fn wines() -> Vec<NewProduct> {
    vec![product("Tinto da Casa", "VINOS", 25, 6), product("Tinto Reserva", "VINOS", 50, 6)]
}

#[tokio::test]
async fn greeting_in_the_morning_touches_no_catalog() {
    let catalog = catalog(wines()).await;
    let sommelier = assistant(catalog.clone());
    let mut state = SessionState::default();

    // 09:00 in Asunción.
    let reply = sommelier.respond_at("oi", &mut state, at("2025-01-15T12:00:00Z")).await;
    assert_eq!(reply, "Ótimo dia! 🍷 Posso te ajudar a escolher uma bebida?");
    assert_eq!(catalog.calls(), 0);
}

#[tokio::test]
async fn price_ceiling_search_and_vague_follow_up() {
    let catalog = catalog(wines()).await;
    let sommelier = assistant(catalog.clone());
    let mut state = SessionState::default();
    let start = at("2025-03-01T20:00:00Z");

    let reply = sommelier.respond_at("vinho até 30 dólares", &mut state, start).await;
    assert!(reply.contains("👉 🍷 Tinto Da Casa - 25,00 dólares"), "{reply}");
    assert!(!reply.contains("Tinto Reserva"), "{reply}");

    // The follow-up reuses remembered filters without re-reading brands or categories.
    let vocabulary_before = catalog.vocabulary_calls();
    let follow_up = sommelier
        .respond_at("e mais barato?", &mut state, start + Duration::seconds(20))
        .await;
    assert!(follow_up.contains("Tinto Da Casa"), "{follow_up}");
    assert!(!follow_up.contains("Tinto Reserva"), "{follow_up}");
    assert_eq!(catalog.vocabulary_calls(), vocabulary_before);

    let remembered = state.memory.recall(start + Duration::seconds(30)).expect("context");
    assert_eq!(remembered.category.as_deref(), Some("VINOS"));
    assert_eq!(remembered.price_max, Some(Decimal::from(30)));
}

#[tokio::test]
async fn most_expensive_whisky() {
    let sommelier = assistant(
        catalog(vec![
            product("Red Label", "WHISKY", 40, 3),
            product("Macallan", "WHISKY", 120, 1),
            product("Old Parr", "WHISKY", 75, 2),
        ])
        .await,
    );
    let mut state = SessionState::default();

    let reply = sommelier.respond("whisky mais caro", &mut state).await;
    assert!(
        reply.ends_with("O Macallan é o mais caro disponível no momento, custando 120,00 dólares."),
        "{reply}"
    );
}

#[tokio::test]
async fn conceptual_question_uses_the_fixed_answer() {
    let llm = Arc::new(CountingLlm::default());
    let sommelier = Sommelier::new(
        catalog(wines()).await,
        GuardedLlm::new(llm.clone(), StdDuration::from_secs(5), 1),
        AssistantConfig::default(),
    );
    let mut state = SessionState::default();

    let reply = sommelier.respond("o que é um espumante brut?", &mut state).await;
    assert_eq!(Some(reply.as_str()), fixed_answer("o que é um espumante brut?"));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn out_of_stock_rows_never_surface() {
    let sommelier = assistant(
        catalog(vec![
            product("Tinto Esgotado", "VINOS", 20, 0),
            product("Whisky Esgotado", "WHISKY", 90, 0),
        ])
        .await,
    );

    let messages = [
        "vinho até 30 dólares",
        "whisky mais caro",
        "qual o vinho mais barato?",
        "quanto custa o Tinto Esgotado?",
        "qual o preço médio do whisky?",
        "whisky encorpado pro churrasco",
    ];
    for message in messages {
        let mut state = SessionState::default();
        let reply = sommelier.respond(message, &mut state).await;
        assert!(!reply.contains("Esgotado"), "{message}: {reply}");
    }

    let mut state = SessionState::default();
    let reply = sommelier.respond("vinho até 30 dólares", &mut state).await;
    assert_eq!(reply, NO_RESULTS);
}

#[tokio::test]
async fn rotation_never_runs_dry() {
    let sommelier = assistant(
        catalog(vec![
            product("Tinto Um", "VINOS", 10, 5),
            product("Tinto Dois", "VINOS", 12, 5),
            product("Tinto Tres", "VINOS", 14, 5),
            product("Tinto Quatro", "VINOS", 16, 5),
        ])
        .await,
    );
    let mut state = SessionState::default();
    let start = at("2025-03-01T20:00:00Z");

    for round in 0..4 {
        let reply = sommelier
            .respond_at("vinho até 30 dólares", &mut state, start + Duration::seconds(round * 10))
            .await;
        assert!(reply.contains("👉"), "round {round}: {reply}");
        assert_ne!(reply, NO_RESULTS);
    }
}

#[tokio::test]
async fn context_expires_after_five_minutes() {
    let sommelier = assistant(catalog(wines()).await);
    let start = at("2025-03-01T20:00:00Z");

    let mut fresh = SessionState::default();
    sommelier.respond_at("vinho até 30 dólares", &mut fresh, start).await;
    let reply = sommelier
        .respond_at("e até 50 dólares?", &mut fresh, start + Duration::seconds(299))
        .await;
    assert!(reply.contains("Tinto Reserva"), "{reply}");

    let mut stale = SessionState::default();
    sommelier.respond_at("vinho até 30 dólares", &mut stale, start).await;
    let reply = sommelier
        .respond_at("e até 50 dólares?", &mut stale, start + Duration::seconds(301))
        .await;
    assert_eq!(reply, CLARIFY_PREFERENCE);
}

#[tokio::test]
async fn absurd_amounts_are_answered_not_fatal() {
    let sommelier = assistant(catalog(wines()).await);

    let mut state = SessionState::default();
    let reply = sommelier.respond("vinho até 9999999999999999999999999999 dólares", &mut state).await;
    assert!(reply.contains("👉 🍷 Tinto Da Casa"), "{reply}");
    assert!(reply.contains("Tinto Reserva"), "{reply}");

    let mut state = SessionState::default();
    let reply = sommelier.respond("vinho de 99999999999999999999999999 litros", &mut state).await;
    assert!(reply.ends_with("Prefere um vinho mais leve ou mais encorpado?"), "{reply}");
}

#[tokio::test]
async fn recommendations_land_in_the_interaction_log() {
    let log = Arc::new(InMemoryInteractionRepository::new());
    let sommelier = assistant(catalog(wines()).await).with_interactions(log.clone());
    let mut state = SessionState::default();
    let start = at("2025-03-01T20:00:00Z");

    sommelier.respond_at("oi", &mut state, start).await;
    let reply = sommelier
        .respond_at("vinho até 30 dólares", &mut state, start + Duration::seconds(5))
        .await;

    let logged = log.recent(10).await.expect("recent interactions");
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].message, "vinho até 30 dólares");
    assert_eq!(logged[0].reply, reply);
    assert_eq!(logged[0].created_at, start + Duration::seconds(5));
}
