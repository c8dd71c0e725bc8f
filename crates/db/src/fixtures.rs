use sommelier_core::domain::product::NewProduct;

use crate::connection::DbPool;
use crate::repositories::{CatalogRepository, RepositoryError, SqlCatalogRepository};

/// Demo beverage catalog: a few products per category, some of them out of stock,
/// so a fresh database can answer searches, price questions and provenance questions.
pub struct DemoCatalog;

impl DemoCatalog {
    pub const JSON: &'static str = include_str!("../../../config/fixtures/demo_catalog.json");

    pub fn products() -> Result<Vec<NewProduct>, RepositoryError> {
        parse_catalog(Self::JSON)
    }

    /// Inserts every demo product whose name is not in the catalog yet.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        load_products(pool, Self::products()?).await
    }

    /// Checks that each demo product is present with its price and stock.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for product in Self::products()? {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE display_name = ?1 AND price_text = ?2 AND stock_quantity = ?3)",
            )
            .bind(&product.display_name)
            .bind(product.price.normalize().to_string())
            .bind(product.stock_quantity)
            .fetch_one(pool)
            .await?;
            checks.push((product.display_name, present == 1));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

/// Parses a catalog document: a JSON array of products.
pub fn parse_catalog(json: &str) -> Result<Vec<NewProduct>, RepositoryError> {
    serde_json::from_str(json)
        .map_err(|error| RepositoryError::Decode(format!("invalid catalog document: {error}")))
}

/// Inserts products through the catalog repository, skipping names already stored.
pub async fn load_products(
    pool: &DbPool,
    products: Vec<NewProduct>,
) -> Result<SeedResult, RepositoryError> {
    let repository = SqlCatalogRepository::new(pool.clone());
    let mut inserted = 0;
    let mut skipped = 0;

    for product in products {
        let exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE display_name = ?1)")
                .bind(&product.display_name)
                .fetch_one(pool)
                .await?;
        if exists == 1 {
            skipped += 1;
            continue;
        }
        repository.insert(product).await?;
        inserted += 1;
    }

    Ok(SeedResult { inserted, skipped })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
