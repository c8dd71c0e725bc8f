use std::sync::Arc;

use tracing::info;

use sommelier_core::config::AssistantConfig;
use sommelier_core::domain::intent::Intent;
use sommelier_core::domain::product::ProductSummary;
use sommelier_core::rotation::RotationState;
use sommelier_db::repositories::{CatalogQuery, CatalogRepository, RepositoryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    pub candidate_window: usize,
    pub result_limit: usize,
    pub rotation_floor: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { candidate_window: 30, result_limit: 6, rotation_floor: 3 }
    }
}

impl From<&AssistantConfig> for SearchLimits {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            candidate_window: config.candidate_window,
            result_limit: config.result_limit,
            rotation_floor: config.rotation_floor,
        }
    }
}

/// Recommendation search: filtered candidate window, then per-session rotation.
#[derive(Clone)]
pub struct CatalogSearch {
    catalog: Arc<dyn CatalogRepository>,
    limits: SearchLimits,
}

impl CatalogSearch {
    pub fn new(catalog: Arc<dyn CatalogRepository>, limits: SearchLimits) -> Self {
        Self { catalog, limits }
    }

    pub fn query_for(&self, intent: &Intent) -> CatalogQuery {
        CatalogQuery {
            category: intent.category.clone(),
            price_min: intent.price_min,
            price_max: intent.price_max,
            volume_min_ml: intent.volume_min_ml,
            volume_max_ml: intent.volume_max_ml,
            sensory_keywords: intent
                .sensory
                .map(|profile| profile.search_keywords().iter().map(|kw| (*kw).to_string()).collect())
                .unwrap_or_default(),
            brand: intent.brand.clone(),
            limit: self.limits.candidate_window,
        }
    }

    /// Never recommends from a bare category: unsearchable intents yield nothing.
    pub async fn search(
        &self,
        intent: &Intent,
        rotation: &mut RotationState,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        if !intent.is_searchable() {
            return Ok(Vec::new());
        }

        let candidates = self.catalog.search(&self.query_for(intent)).await?;
        let candidate_count = candidates.len();
        let signature = RotationState::signature_for(intent);
        let picked = rotation.select(
            &signature,
            candidates,
            self.limits.result_limit,
            self.limits.rotation_floor,
            |product| product.id,
        );

        info!(
            event_name = "sommelier.search.completed",
            category = intent.category.as_deref().unwrap_or_default(),
            candidates = candidate_count,
            returned = picked.len(),
            shown_for_signature = rotation.shown_for(&signature),
            "catalog search completed"
        );

        Ok(picked.iter().map(ProductSummary::from).collect())
    }
}
