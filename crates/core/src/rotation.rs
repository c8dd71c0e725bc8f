use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::intent::{Intent, SensoryProfile};
use crate::domain::product::ProductId;

/// Products already shown per filter signature, so follow-ups surface new labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    shown: BTreeMap<String, BTreeSet<ProductId>>,
}

impl RotationState {
    /// Stable key over the filters that define "the same question".
    pub fn signature(
        category: Option<&str>,
        sensory: Option<SensoryProfile>,
        price_min: Option<Decimal>,
        price_max: Option<Decimal>,
    ) -> String {
        let amount = |value: Option<Decimal>| value.map(|v| v.normalize().to_string()).unwrap_or_default();
        let material = format!(
            "{}|{}|{}|{}",
            category.unwrap_or_default(),
            sensory.map(|profile| profile.as_str()).unwrap_or_default(),
            amount(price_min),
            amount(price_max),
        );
        blake3::hash(material.as_bytes()).to_hex().to_string()
    }

    pub fn signature_for(intent: &Intent) -> String {
        Self::signature(intent.category.as_deref(), intent.sensory, intent.price_min, intent.price_max)
    }

    pub fn shown_for(&self, signature: &str) -> usize {
        self.shown.get(signature).map(BTreeSet::len).unwrap_or(0)
    }

    /// Picks up to `limit` unseen candidates, in candidate order.
    ///
    /// With fewer than `floor` unseen candidates left the signature is reset and
    /// selection restarts from the full window, so a non-empty window never
    /// yields an empty page.
    pub fn select<T, F>(
        &mut self,
        signature: &str,
        candidates: Vec<T>,
        limit: usize,
        floor: usize,
        id_of: F,
    ) -> Vec<T>
    where
        F: Fn(&T) -> ProductId,
    {
        if candidates.is_empty() || limit == 0 {
            return Vec::new();
        }

        let seen = self.shown.entry(signature.to_string()).or_default();
        let unseen = candidates.iter().filter(|candidate| !seen.contains(&id_of(candidate))).count();

        let picked: Vec<T> = if unseen < floor {
            seen.clear();
            candidates.into_iter().take(limit).collect()
        } else {
            candidates
                .into_iter()
                .filter(|candidate| !seen.contains(&id_of(candidate)))
                .take(limit)
                .collect()
        };

        seen.extend(picked.iter().map(&id_of));
        picked
    }
}
