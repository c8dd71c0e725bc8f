use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sommelier_core::domain::product::{is_valid_origin, NewProduct, Product, ProductId};
use sommelier_core::nlp::normalize::normalize;
use sommelier_core::session::{SessionId, SessionState};

use super::{
    average_of, best_match, from_cents, price_cents, CatalogQuery, CatalogRepository, Interaction,
    InteractionRepository, NewInteraction, PriceOrder, PriceStats, RepositoryError,
    SessionRepository,
};

/// Catalog kept in a vector; mirrors the SQL ordering rules for tests and demos.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_query(product: &Product, query: &CatalogQuery) -> bool {
    let cents = price_cents(product.price);
    product.is_available()
        && query.category.as_ref().map_or(true, |category| &product.category == category)
        && query.price_min.map_or(true, |min| cents >= price_cents(min))
        && query.price_max.map_or(true, |max| cents <= price_cents(max))
        && query
            .volume_min_ml
            .map_or(true, |min| product.volume_ml.is_some_and(|volume| volume >= min))
        && query
            .volume_max_ml
            .map_or(true, |max| product.volume_ml.is_some_and(|volume| volume <= max))
}

fn keyword_hit(product: &Product, keywords: &[String]) -> bool {
    let haystack = format!(" {} ", product.search_text);
    keywords.iter().any(|keyword| haystack.contains(&format!(" {} ", normalize(keyword))))
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn insert(&self, product: NewProduct) -> Result<ProductId, RepositoryError> {
        let mut products = self.products.write().await;
        let id = ProductId(products.iter().map(|existing| existing.id.0).max().unwrap_or(0) + 1);
        let mut product = product.into_product(id);
        product.stock_quantity = product.stock_quantity.max(0);
        products.push(product);
        Ok(id)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.iter().find(|product| product.id == id).cloned())
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<&Product> =
            products.iter().filter(|product| matches_query(product, query)).collect();

        found.sort_by_key(|product| {
            let brand_miss = query.brand.as_ref().map_or(false, |brand| {
                product.brand_normalized.as_ref() != Some(brand)
            });
            let keyword_miss = !query.sensory_keywords.is_empty()
                && !keyword_hit(product, &query.sensory_keywords);
            (brand_miss, keyword_miss, price_cents(product.price), product.id)
        });

        Ok(found.into_iter().take(query.limit).cloned().collect())
    }

    async fn price_stats(&self, category: &str) -> Result<Option<PriceStats>, RepositoryError> {
        let products = self.products.read().await;
        let cents: Vec<i64> = products
            .iter()
            .filter(|product| product.is_available() && product.category == category)
            .map(|product| price_cents(product.price))
            .collect();

        let (Some(min), Some(max)) = (cents.iter().min(), cents.iter().max()) else {
            return Ok(None);
        };
        let count = i64::try_from(cents.len()).unwrap_or(i64::MAX);
        Ok(Some(PriceStats {
            min: from_cents(*min),
            avg: average_of(cents.iter().sum(), count),
            max: from_cents(*max),
            count,
        }))
    }

    async fn price_extreme(
        &self,
        category: Option<&str>,
        order: PriceOrder,
    ) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        let candidates = products.iter().filter(|product| {
            product.is_available() && category.map_or(true, |category| product.category == category)
        });

        let picked = match order {
            PriceOrder::Cheapest => {
                candidates.min_by_key(|product| (price_cents(product.price), product.id))
            }
            PriceOrder::MostExpensive => candidates
                .min_by_key(|product| (std::cmp::Reverse(price_cents(product.price)), product.id)),
        };
        Ok(picked.cloned())
    }

    async fn find_best_match(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(best_match(&normalize(query), threshold, products.iter()).cloned())
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let products = self.products.read().await;
        let mut categories: Vec<String> = products
            .iter()
            .filter(|product| product.is_available())
            .map(|product| product.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn distinct_brands(&self) -> Result<Vec<String>, RepositoryError> {
        let products = self.products.read().await;
        let mut brands: Vec<String> = products
            .iter()
            .filter(|product| product.is_available())
            .filter_map(|product| product.brand_normalized.clone())
            .filter(|brand| !brand.is_empty())
            .collect();
        brands.sort();
        brands.dedup();
        Ok(brands)
    }

    async fn update_origin(
        &self,
        id: ProductId,
        country: &str,
        summary: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let country = country.trim();
        if !is_valid_origin(country) {
            return Err(RepositoryError::Decode(format!("refusing to store origin '{country}'")));
        }

        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {}", id.0)))?;
        product.country_of_origin = Some(country.to_string());
        if let Some(summary) = summary {
            product.origin_summary = Some(summary.to_string());
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let products = self.products.read().await;
        Ok(i64::try_from(products.len()).unwrap_or(i64::MAX))
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, (SessionState, DateTime<Utc>)>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).map(|(state, _)| state.clone()))
    }

    async fn save(
        &self,
        id: &SessionId,
        state: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), (state.clone(), now));
        Ok(())
    }

    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (_, updated_at)| *updated_at >= cutoff);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}

/// Interaction log kept in insertion order.
#[derive(Default)]
pub struct InMemoryInteractionRepository {
    interactions: RwLock<Vec<Interaction>>,
}

impl InMemoryInteractionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn record(&self, interaction: NewInteraction) -> Result<i64, RepositoryError> {
        let mut interactions = self.interactions.write().await;
        let id = i64::try_from(interactions.len()).unwrap_or(i64::MAX - 1) + 1;
        interactions.push(Interaction {
            id,
            kind: interaction.kind,
            message: interaction.message,
            reply: interaction.reply,
            created_at: interaction.created_at,
        });
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Interaction>, RepositoryError> {
        let interactions = self.interactions.read().await;
        let mut rows = interactions.clone();
        rows.sort_by(|left, right| {
            right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
