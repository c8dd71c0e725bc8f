use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sommelier_core::domain::product::{is_valid_origin, NewProduct, Product, ProductId};
use sommelier_core::nlp::normalize::normalize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use super::{
    average_of, best_match, from_cents, price_cents, CatalogQuery, CatalogRepository, PriceOrder,
    PriceStats, RepositoryError,
};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "id, display_name, category, brand, brand_normalized, price_text, \
     stock_quantity, volume_ml, country_of_origin, origin_summary, search_text";

/// Rows fetched for in-process fuzzy scoring of a product mention.
const MATCH_CANDIDATE_LIMIT: i64 = 500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: i64,
    pub display_name: String,
    pub category: String,
    pub brand: Option<String>,
    pub brand_normalized: Option<String>,
    pub price_text: String,
    pub stock_quantity: i64,
    pub volume_ml: Option<i64>,
    pub country_of_origin: Option<String>,
    pub origin_summary: Option<String>,
    pub search_text: String,
}

impl TryFrom<ProductRecord> for Product {
    type Error = RepositoryError;

    fn try_from(value: ProductRecord) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(value.price_text.trim()).map_err(|error| {
            RepositoryError::Decode(format!(
                "invalid price '{}' for product {}: {error}",
                value.price_text, value.id
            ))
        })?;
        let volume_ml = value
            .volume_ml
            .map(|volume| {
                i32::try_from(volume).map_err(|_| {
                    RepositoryError::Decode(format!(
                        "volume {volume} out of range for product {}",
                        value.id
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            id: ProductId(value.id),
            display_name: value.display_name,
            category: value.category,
            brand: value.brand,
            brand_normalized: value.brand_normalized,
            price,
            stock_quantity: value.stock_quantity,
            volume_ml,
            country_of_origin: value.country_of_origin,
            origin_summary: value.origin_summary,
            search_text: value.search_text,
        })
    }
}

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn insert(&self, product: NewProduct) -> Result<ProductId, RepositoryError> {
        let brand_normalized = product.brand_normalized();
        let search_text = product.search_text();
        let country = product
            .country_of_origin
            .as_deref()
            .map(str::trim)
            .filter(|origin| is_valid_origin(origin));

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                display_name, category, brand, brand_normalized, price_text, price_cents,
                stock_quantity, volume_ml, country_of_origin, search_text
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.display_name)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(brand_normalized)
        .bind(product.price.normalize().to_string())
        .bind(price_cents(product.price))
        .bind(product.stock_quantity.max(0))
        .bind(product.volume_ml)
        .bind(country)
        .bind(search_text)
        .execute(&self.pool)
        .await?;

        Ok(ProductId(result.last_insert_rowid()))
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock_quantity > 0"
        ));
        if let Some(category) = &query.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(min) = query.price_min {
            builder.push(" AND price_cents >= ").push_bind(price_cents(min));
        }
        if let Some(max) = query.price_max {
            builder.push(" AND price_cents <= ").push_bind(price_cents(max));
        }
        if let Some(min) = query.volume_min_ml {
            builder.push(" AND volume_ml >= ").push_bind(min);
        }
        if let Some(max) = query.volume_max_ml {
            builder.push(" AND volume_ml <= ").push_bind(max);
        }

        builder.push(" ORDER BY ");
        if let Some(brand) = &query.brand {
            builder
                .push("CASE WHEN brand_normalized = ")
                .push_bind(brand.clone())
                .push(" THEN 0 ELSE 1 END, ");
        }
        if !query.sensory_keywords.is_empty() {
            builder.push("CASE WHEN ");
            for (index, keyword) in query.sensory_keywords.iter().enumerate() {
                if index > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push("(' ' || search_text || ' ') LIKE ")
                    .push_bind(format!("% {} %", normalize(keyword)));
            }
            builder.push(" THEN 0 ELSE 1 END, ");
        }
        builder.push("price_cents ASC, id ASC LIMIT ").push_bind(limit_param(query.limit));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn price_stats(&self, category: &str) -> Result<Option<PriceStats>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS count,
                MIN(price_cents) AS min_cents,
                MAX(price_cents) AS max_cents,
                SUM(price_cents) AS sum_cents
            FROM products
            WHERE category = ? AND stock_quantity > 0
            "#,
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        let min: Option<i64> = row.try_get("min_cents")?;
        let max: Option<i64> = row.try_get("max_cents")?;
        let sum: Option<i64> = row.try_get("sum_cents")?;

        match (min, max, sum) {
            (Some(min), Some(max), Some(sum)) if count > 0 => Ok(Some(PriceStats {
                min: from_cents(min),
                avg: average_of(sum, count),
                max: from_cents(max),
                count,
            })),
            _ => Ok(None),
        }
    }

    async fn price_extreme(
        &self,
        category: Option<&str>,
        order: PriceOrder,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock_quantity > 0"
        ));
        if let Some(category) = category {
            builder.push(" AND category = ").push_bind(category.to_string());
        }
        builder.push(match order {
            PriceOrder::Cheapest => " ORDER BY price_cents ASC, id ASC LIMIT 1",
            PriceOrder::MostExpensive => " ORDER BY price_cents DESC, id ASC LIMIT 1",
        });

        let row = builder.build().fetch_optional(&self.pool).await?;
        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn find_best_match(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<Option<Product>, RepositoryError> {
        let normalized = normalize(query);
        let prefixes: Vec<String> = normalized
            .split_whitespace()
            .filter(|token| token.len() >= 3)
            .map(|token| token.chars().take(3).collect())
            .collect();
        if prefixes.is_empty() {
            return Ok(None);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock_quantity > 0 AND ("
        ));
        for (index, prefix) in prefixes.iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            builder.push("search_text LIKE ").push_bind(format!("%{prefix}%"));
        }
        builder.push(") ORDER BY id ASC LIMIT ").push_bind(MATCH_CANDIDATE_LIMIT);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let candidates = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(best_match(&normalized, threshold, &candidates).cloned())
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products WHERE stock_quantity > 0 ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn distinct_brands(&self) -> Result<Vec<String>, RepositoryError> {
        let brands = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT brand_normalized
            FROM products
            WHERE stock_quantity > 0 AND brand_normalized IS NOT NULL AND brand_normalized != ''
            ORDER BY brand_normalized
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
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

        let result = sqlx::query(
            r#"
            UPDATE products
            SET country_of_origin = ?, origin_summary = COALESCE(?, origin_summary)
            WHERE id = ?
            "#,
        )
        .bind(country)
        .bind(summary)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product {}", id.0)));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn product_record_from_row(row: &SqliteRow) -> Result<ProductRecord, RepositoryError> {
    Ok(ProductRecord {
        id: row.try_get("id")?,
        display_name: row.try_get("display_name")?,
        category: row.try_get("category")?,
        brand: row.try_get("brand")?,
        brand_normalized: row.try_get("brand_normalized")?,
        price_text: row.try_get("price_text")?,
        stock_quantity: row.try_get("stock_quantity")?,
        volume_ml: row.try_get("volume_ml")?,
        country_of_origin: row.try_get("country_of_origin")?,
        origin_summary: row.try_get("origin_summary")?,
        search_text: row.try_get("search_text")?,
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Product::try_from(product_record_from_row(row)?)
}
