use std::collections::BTreeSet;

use super::normalize::normalize;

/// Word trigrams padded the way pg_trgm pads them (two leading spaces, one trailing).
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let mut grams = BTreeSet::new();
    for word in normalize(text).split_whitespace() {
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            grams.insert(window.iter().collect());
        }
    }
    grams
}

/// Shared trigrams over the union of both sets, in `[0, 1]`.
pub fn trigram_similarity(left: &str, right: &str) -> f64 {
    let left = trigrams(left);
    let right = trigrams(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

/// Fraction of the query's trigrams found in the candidate, in `[0, 1]`.
///
/// Unlike [`trigram_similarity`] this does not penalize long candidates, which is
/// what a short product mention matched against denormalized search text needs.
pub fn trigram_containment(query: &str, candidate: &str) -> f64 {
    let query = trigrams(query);
    if query.is_empty() {
        return 0.0;
    }
    let candidate = trigrams(candidate);
    let shared = query.intersection(&candidate).count();
    shared as f64 / query.len() as f64
}

/// Best of whole-text and per-token similarity against a short label such as a category.
pub fn label_similarity(text: &str, label: &str) -> f64 {
    let whole = trigram_similarity(text, label);
    normalize(text)
        .split_whitespace()
        .filter(|token| token.len() >= 4)
        .map(|token| trigram_similarity(token, label))
        .fold(whole, f64::max)
}

/// Ranking score for a product lookup: containment first, name closeness as a tie-breaker.
pub fn product_match_score(query: &str, search_text: &str, display_name: &str) -> (f64, f64) {
    let containment = trigram_containment(query, search_text);
    let closeness = strsim::jaro_winkler(&normalize(query), &normalize(display_name));
    (containment, closeness)
}
