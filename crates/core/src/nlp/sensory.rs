use std::sync::OnceLock;

use super::normalize::{prepare, replace_phrases};
use super::pattern::PatternTable;
use crate::domain::intent::SensoryProfile;

const REWRITES: &[(&str, &str)] = &[
    ("nao muito doce", "seco"),
    ("nao tao doce", "seco"),
    ("nao doce", "seco"),
    ("docinho", "doce"),
    ("bem doce", "doce"),
    ("pouco doce", "doce"),
    ("extra seco", "extra brut"),
];

/// Dry comes first: a brut label is never classified as sweet.
const PROFILES: &[(&str, SensoryProfile)] = &[
    (r"\b(extra brut|brut|dry|seco|seca|secos)\b", SensoryProfile::Dry),
    (r"\b(doce|doces|dulce|sweet|adocicado|adocicada|meloso|licoroso)\b", SensoryProfile::Sweet),
    (r"\b(suave|leve|ligero|liviano|tranquilo|light|facil de beber)\b", SensoryProfile::Light),
    (r"\b(forte|fuerte|encorpado|encorpada|intenso|intensa|potente|pesado)\b", SensoryProfile::Intense),
    (r"\b(amargo|amarga|amargor|bitter|ipa|lupulo|lupulada)\b", SensoryProfile::Bitter),
    (r"\b(frutado|frutada|frutas|frutal|aromatico|aromatica|citrico)\b", SensoryProfile::Fruity),
];

fn profiles() -> &'static PatternTable<SensoryProfile> {
    static PROFILES_TABLE: OnceLock<PatternTable<SensoryProfile>> = OnceLock::new();
    PROFILES_TABLE.get_or_init(|| PatternTable::new(PROFILES))
}

pub fn extract_sensory(text: &str) -> Option<SensoryProfile> {
    let prepared = prepare(text);
    if prepared.is_empty() {
        return None;
    }
    profiles().first_match(&replace_phrases(&prepared, REWRITES))
}
