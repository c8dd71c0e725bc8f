use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use sommelier_core::domain::product::{NewProduct, Product, ProductId};
use sommelier_core::errors::ApplicationError;
use sommelier_core::session::{SessionId, SessionState};

pub mod catalog;
pub mod interaction;
pub mod memory;
pub mod session;

pub use catalog::SqlCatalogRepository;
pub use interaction::SqlInteractionRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryInteractionRepository, InMemorySessionRepository,
};
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Persistence(value.to_string())
    }
}

/// Filters for a recommendation query. Bounds are inclusive; absent means unbounded.
///
/// Brand and sensory keywords only reorder rows, they never exclude any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub volume_min_ml: Option<i32>,
    pub volume_max_ml: Option<i32>,
    pub sensory_keywords: Vec<String>,
    pub brand: Option<String>,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceStats {
    pub min: Decimal,
    pub avg: Decimal,
    pub max: Decimal,
    pub count: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceOrder {
    Cheapest,
    MostExpensive,
}

/// Read-mostly view of the beverage catalog. Every read excludes out-of-stock rows.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert(&self, product: NewProduct) -> Result<ProductId, RepositoryError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Ordered by brand match, sensory keyword match, then ascending price.
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError>;

    async fn price_stats(&self, category: &str) -> Result<Option<PriceStats>, RepositoryError>;

    async fn price_extreme(
        &self,
        category: Option<&str>,
        order: PriceOrder,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Closest product to a free-text mention, if it clears `threshold`.
    async fn find_best_match(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<Option<Product>, RepositoryError>;

    async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError>;

    async fn distinct_brands(&self) -> Result<Vec<String>, RepositoryError>;

    /// Writes a resolved origin. Writing the same value twice is harmless.
    async fn update_origin(
        &self,
        id: ProductId,
        country: &str,
        summary: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionState>, RepositoryError>;

    async fn save(
        &self,
        id: &SessionId,
        state: &SessionState,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Drops sessions idle since before `cutoff`; returns how many were removed.
    async fn purge_idle(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Recommendation,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recommendation => "recommendation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recommendation" => Some(Self::Recommendation),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewInteraction {
    pub kind: InteractionKind,
    pub message: String,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    pub id: i64,
    pub kind: InteractionKind,
    pub message: String,
    pub reply: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only log of answered recommendations.
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn record(&self, interaction: NewInteraction) -> Result<i64, RepositoryError>;

    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Interaction>, RepositoryError>;
}

/// Shared candidate scoring for product lookups: containment, then name closeness.
pub(crate) fn best_match<'a, I>(query: &str, threshold: f64, candidates: I) -> Option<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    candidates
        .into_iter()
        .filter(|product| product.is_available())
        .map(|product| {
            let score = sommelier_core::nlp::similarity::product_match_score(
                query,
                &product.search_text,
                &product.display_name,
            );
            (score, product)
        })
        .filter(|((containment, _), _)| *containment >= threshold)
        .max_by(|(left, left_product), (right, right_product)| {
            left.0
                .total_cmp(&right.0)
                .then(left.1.total_cmp(&right.1))
                .then_with(|| right_product.id.cmp(&left_product.id))
        })
        .map(|(_, product)| product)
}

/// Saturates at the `i64` range so absurd bounds still filter as "no limit".
pub(crate) fn price_cents(price: Decimal) -> i64 {
    let saturated = if price.is_sign_negative() { i64::MIN } else { i64::MAX };
    price
        .checked_mul(Decimal::from(100))
        .and_then(|cents| {
            cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_i64()
        })
        .unwrap_or(saturated)
}

pub(crate) fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub(crate) fn average_of(sum_cents: i64, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (Decimal::new(sum_cents, 2) / Decimal::from(count)).round_dp(2)
}
