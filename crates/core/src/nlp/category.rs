//! Free text to catalog category.
//!
//! Resolution order, first hit wins: multi-word phrase aliases, token windows,
//! single-token aliases, semantic heuristics, and finally fuzzy similarity
//! against the category values the catalog actually holds.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::normalize::{contains_phrase, prepare, tokenize};
use super::pattern::PatternTable;
use super::similarity::label_similarity;

pub const VINOS: &str = "VINOS";
pub const WHISKY: &str = "WHISKY";
pub const CERVEZA: &str = "CERVEZA";
pub const ESPUMANTES: &str = "ESPUMANTES";
pub const GIN: &str = "GIN";
pub const VODKA: &str = "VODKA";
pub const LICORES: &str = "LICORES";
pub const CACHACA: &str = "CACHAÇA";
pub const RON: &str = "RON";
pub const ENERGETICO: &str = "ENERGÉTICO";
pub const AGUA: &str = "AGUA";
pub const DESTILADOS: &str = "DESTILADOS";
pub const SEM_ALCOOL: &str = "SEM_ALCOOL";

const ALIASES: &[(&str, &str)] = &[
    ("vinho", VINOS),
    ("vino", VINOS),
    ("vinos", VINOS),
    ("tinto", VINOS),
    ("tintos", VINOS),
    ("branco", VINOS),
    ("brancos", VINOS),
    ("rose", VINOS),
    ("rosado", VINOS),
    ("malbec", VINOS),
    ("merlot", VINOS),
    ("cabernet", VINOS),
    ("syrah", VINOS),
    ("sauvignon", VINOS),
    ("tempranillo", VINOS),
    ("whisky", WHISKY),
    ("whiskey", WHISKY),
    ("whiskies", WHISKY),
    ("bourbon", WHISKY),
    ("scotch", WHISKY),
    ("single malt", WHISKY),
    ("cerveja", CERVEZA),
    ("cerveza", CERVEZA),
    ("beer", CERVEZA),
    ("breja", CERVEZA),
    ("ipa", CERVEZA),
    ("pilsen", CERVEZA),
    ("lager", CERVEZA),
    ("stout", CERVEZA),
    ("weiss", CERVEZA),
    ("espumante", ESPUMANTES),
    ("champagne", ESPUMANTES),
    ("champanhe", ESPUMANTES),
    ("prosecco", ESPUMANTES),
    ("brut", ESPUMANTES),
    ("demi sec", ESPUMANTES),
    ("extra dry", ESPUMANTES),
    ("gin", GIN),
    ("gintonic", GIN),
    ("gin tonica", GIN),
    ("vodka", VODKA),
    ("vodkas", VODKA),
    ("vodka ice", VODKA),
    ("licor", LICORES),
    ("amarula", LICORES),
    ("baileys", LICORES),
    ("cointreau", LICORES),
    ("triple sec", LICORES),
    ("cachaca", CACHACA),
    ("pinga", CACHACA),
    ("caninha", CACHACA),
    ("rum", RON),
    ("ron", RON),
    ("rhum", RON),
    ("energetico", ENERGETICO),
    ("energy", ENERGETICO),
    ("red bull", ENERGETICO),
    ("monster", ENERGETICO),
    ("agua", AGUA),
    ("agua mineral", AGUA),
    ("sem gas", AGUA),
    ("com gas", AGUA),
];

/// Aliases that also describe packaging or mixers; consulted only after the strong table.
const WEAK_ALIASES: &[(&str, &str)] = &[
    ("blend", VINOS),
    ("malt", WHISKY),
    ("blended", WHISKY),
    ("long neck", CERVEZA),
    ("tonica", GIN),
    ("ice", VODKA),
    ("mineral", AGUA),
];

const HEURISTICS: &[(&str, &str)] = &[
    (r"\b(10|12|15|18|21|25|30)\s*anos?\b", WHISKY),
    (
        r"\b(malbec|merlot|cabernet|syrah|shiraz|tannat|carmenere|pinot|chardonnay|sauvignon|tempranillo|moscatel|torrontes)\b",
        VINOS,
    ),
    (r"\b(ipa|apa|pilsen|pilsner|lager|stout|weiss|weizen|ale|porter)\b", CERVEZA),
    (r"\b(brut|demi sec|extra dry|champagne|prosecco|cava)\b", ESPUMANTES),
];

#[derive(Debug)]
pub struct CategoryClassifier {
    strong: AliasTable,
    weak: AliasTable,
    heuristics: PatternTable<&'static str>,
}

#[derive(Debug)]
struct AliasTable {
    by_alias: HashMap<&'static str, &'static str>,
    /// Multi-word aliases, longest first.
    phrases: Vec<(&'static str, &'static str)>,
}

impl AliasTable {
    fn new(entries: &[(&'static str, &'static str)]) -> Self {
        let by_alias = entries.iter().copied().collect::<HashMap<_, _>>();
        let mut phrases =
            entries.iter().copied().filter(|(alias, _)| alias.contains(' ')).collect::<Vec<_>>();
        phrases.sort_by(|left, right| right.0.len().cmp(&left.0.len()).then(left.0.cmp(right.0)));
        Self { by_alias, phrases }
    }

    fn lookup(&self, normalized: &str) -> Option<&'static str> {
        if let Some((_, category)) =
            self.phrases.iter().find(|(phrase, _)| contains_phrase(normalized, phrase))
        {
            return Some(category);
        }

        let tokens = tokenize(normalized);
        for size in [3, 2] {
            for window in tokens.windows(size) {
                if let Some(category) = self.by_alias.get(window.join(" ").as_str()) {
                    return Some(category);
                }
            }
        }

        tokens.iter().find_map(|token| self.by_alias.get(token).copied())
    }
}

impl CategoryClassifier {
    pub fn new() -> Self {
        Self {
            strong: AliasTable::new(ALIASES),
            weak: AliasTable::new(WEAK_ALIASES),
            heuristics: PatternTable::new(HEURISTICS),
        }
    }

    /// Process-wide classifier; the alias table is static data, built once.
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<CategoryClassifier> = OnceLock::new();
        SHARED.get_or_init(Self::new)
    }

    /// Static resolution only: aliases then heuristics. Never touches the catalog.
    pub fn classify(&self, text: &str) -> Option<String> {
        let normalized = prepare(text);
        if normalized.is_empty() {
            return None;
        }

        self.strong
            .lookup(&normalized)
            .or_else(|| self.weak.lookup(&normalized))
            .or_else(|| self.heuristics.first_match(&normalized))
            .map(str::to_string)
    }

    /// Static resolution, then fuzzy similarity against catalog category values.
    pub fn classify_with_catalog(
        &self,
        text: &str,
        catalog_categories: &[String],
        threshold: f64,
    ) -> Option<String> {
        if let Some(category) = self.classify(text) {
            return Some(category);
        }
        fuzzy_category(text, catalog_categories, threshold)
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fuzzy_category(text: &str, catalog_categories: &[String], threshold: f64) -> Option<String> {
    let normalized = prepare(text);
    if normalized.is_empty() {
        return None;
    }

    catalog_categories
        .iter()
        .map(|category| (label_similarity(&normalized, category), category))
        .filter(|(score, _)| *score > threshold)
        .max_by(|left, right| left.0.total_cmp(&right.0).then_with(|| right.1.cmp(left.1)))
        .map(|(_, category)| category.clone())
}
