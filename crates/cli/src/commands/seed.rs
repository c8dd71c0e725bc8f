use std::fs;
use std::path::Path;

use sommelier_db::{load_products, parse_catalog, DemoCatalog, SeedResult};

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

/// Loads the bundled demo catalog, or a JSON catalog document from `file`.
/// Products already present by name are left untouched.
pub fn run(file: Option<&Path>) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let custom = match file.map(read_catalog).transpose() {
        Ok(custom) => custom,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("seed", error_class, message, exit_code);
        }
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let run_result = match custom {
            Some(products) => load_products(&pool, products)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8)),
            None => seed_demo(&pool).await,
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(file, seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn seed_demo(pool: &sommelier_db::DbPool) -> Result<SeedResult, Failure> {
    let seeded = DemoCatalog::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

    let verification = DemoCatalog::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
    if !verification.all_present {
        let missing = verification
            .checks
            .iter()
            .filter_map(|(name, present)| (!present).then_some(name.as_str()))
            .collect::<Vec<_>>();
        return Err(("seed_verification", verification_message(&missing), 6u8));
    }
    Ok(seeded)
}

fn read_catalog(path: &Path) -> Result<Vec<sommelier_core::domain::product::NewProduct>, Failure> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ("seed_input", format!("failed to read `{}`: {error}", path.display()), 2u8)
    })?;
    parse_catalog(&raw).map_err(|error| ("seed_input", error.to_string(), 2u8))
}

fn verification_message(missing: &[&str]) -> String {
    if missing.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for products: {}", missing.join(", "))
    }
}

fn summary(file: Option<&Path>, seeded: SeedResult) -> String {
    let source = match file {
        Some(path) => format!("catalog `{}`", path.display()),
        None => "demo catalog".to_string(),
    };
    format!("{source}: {} inserted, {} already present", seeded.inserted, seeded.skipped)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sommelier_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn verification_error_message_names_missing_products() {
        assert_eq!(
            verification_message(&["Malbec Reserva", "Old Parr 12 Anos"]),
            "Seed verification failed for products: Malbec Reserva, Old Parr 12 Anos"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        assert_eq!(verification_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn summary_names_the_source() {
        let seeded = SeedResult { inserted: 3, skipped: 1 };
        assert_eq!(summary(None, seeded), "demo catalog: 3 inserted, 1 already present");
        assert_eq!(
            summary(Some(Path::new("shop.json")), seeded),
            "catalog `shop.json`: 3 inserted, 1 already present"
        );
    }
}
