use std::collections::HashSet;

use rust_decimal::Decimal;
use sommelier_core::domain::product::is_valid_origin;
use sommelier_core::nlp::category::{CERVEZA, ESPUMANTES, VINOS, WHISKY};
use sommelier_db::repositories::{CatalogQuery, CatalogRepository, SqlCatalogRepository};
use sommelier_db::{connect_with_settings, migrations, DemoCatalog};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

#[test]
fn demo_rows_are_well_formed() -> SeedContractTestResult {
    let products = DemoCatalog::products().map_err(|error| error.to_string())?;
    let mut names = HashSet::new();

    for product in &products {
        require!(
            names.insert(product.display_name.to_lowercase()),
            "duplicate demo product `{}`",
            product.display_name
        );
        require!(product.price > Decimal::ZERO, "`{}` has no price", product.display_name);
        require!(product.price.scale() <= 2, "`{}` price has sub-cent digits", product.display_name);
        require!(product.stock_quantity >= 0, "`{}` has negative stock", product.display_name);
        require!(
            product.category == product.category.to_uppercase(),
            "`{}` category `{}` is not upper case",
            product.display_name,
            product.category
        );
        if let Some(volume) = product.volume_ml {
            require!(volume > 0, "`{}` has a non-positive volume", product.display_name);
        }
        if let Some(origin) = &product.country_of_origin {
            require!(is_valid_origin(origin), "`{}` origin `{origin}` is rejected", product.display_name);
        }
    }
    Ok(())
}

#[test]
fn demo_catalog_covers_the_core_categories() -> SeedContractTestResult {
    let products = DemoCatalog::products().map_err(|error| error.to_string())?;

    for category in [VINOS, WHISKY, CERVEZA, ESPUMANTES] {
        let in_stock = products
            .iter()
            .filter(|product| product.category == category && product.stock_quantity > 0)
            .count();
        require!(in_stock >= 3, "category {category} has only {in_stock} products in stock");
    }
    require!(
        products.iter().any(|product| product.stock_quantity == 0),
        "demo catalog needs an out-of-stock row"
    );
    require!(
        products.iter().any(|product| product.country_of_origin.is_none()),
        "demo catalog needs a row without origin"
    );
    Ok(())
}

#[tokio::test]
async fn seeded_catalog_hides_out_of_stock_rows() -> SeedContractTestResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
    DemoCatalog::load(&pool).await.map_err(|e| e.to_string())?;

    let products = DemoCatalog::products().map_err(|e| e.to_string())?;
    let in_stock = products.iter().filter(|product| product.stock_quantity > 0).count();

    let repository = SqlCatalogRepository::new(pool);
    require_eq!(repository.count().await.map_err(|e| e.to_string())?, products.len() as i64);

    let visible = repository
        .search(&CatalogQuery { limit: products.len(), ..CatalogQuery::default() })
        .await
        .map_err(|e| e.to_string())?;
    require_eq!(visible.len(), in_stock);
    require!(visible.iter().all(|product| product.stock_quantity > 0));
    Ok(())
}
