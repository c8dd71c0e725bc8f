use std::sync::OnceLock;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::normalize::{normalize_numeric, prepare};
use super::pattern::{Pattern, PatternTable};
use super::price::parse_amount;
use crate::domain::intent::VolumeRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Packaging {
    min_ml: Option<i32>,
    max_ml: Option<i32>,
}

const PACKAGING: &[(&str, Packaging)] = &[
    (r"\blong neck\b", Packaging { min_ml: Some(330), max_ml: Some(355) }),
    (r"\b(lata|latinha|latao)\b", Packaging { min_ml: Some(269), max_ml: Some(473) }),
    (r"\bgarrafa padrao\b", Packaging { min_ml: Some(750), max_ml: None }),
    (r"\b(litrao|garrafao|magnum|jarra)\b", Packaging { min_ml: Some(1000), max_ml: None }),
    (r"\b(mini|miniatura|dose|shot)\b", Packaging { min_ml: Some(30), max_ml: Some(60) }),
];

struct VolumePatterns {
    between: Pattern,
    ceiling: Pattern,
    floor: Pattern,
    millilitres: Pattern,
    litres: Pattern,
    packaging: PatternTable<Packaging>,
}

fn patterns() -> &'static VolumePatterns {
    static PATTERNS: OnceLock<VolumePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| VolumePatterns {
        between: Pattern::new(
            r"\bentre\s+(\d+(?:[.,]\d+)*)\s*(ml|cl|l|lt|lts|litro|litros)?\s*(?:e|a|y)\s+(\d+(?:[.,]\d+)*)\s*(ml|cl|l|lt|lts|litro|litros)\b",
        ),
        ceiling: Pattern::new(
            r"\b(?:ate|no maximo|menos de|abaixo de|menor que|hasta)\s+(\d+(?:[.,]\d+)*)\s*(ml|cl|l|lt|lts|litro|litros)\b",
        ),
        floor: Pattern::new(
            r"\b(?:acima de|mais de|superior a|maior que|a partir de|desde)\s+(\d+(?:[.,]\d+)*)\s*(ml|cl|l|lt|lts|litro|litros)\b",
        ),
        millilitres: Pattern::new(r"\b(\d{2,4})\s*ml\b"),
        litres: Pattern::new(r"\b(\d+(?:[.,]\d+)?)\s*(l|lt|lts|litro|litros)\b"),
        packaging: PatternTable::new(PACKAGING),
    })
}

/// Volume in millilitres. Litres are converted with half-away-from-zero rounding.
pub fn extract_volume(text: &str) -> VolumeRange {
    let patterns = patterns();
    let numeric = normalize_numeric(text);

    if let Some(captures) = patterns.between.captures(&numeric) {
        let unit_second = captures.get(4).map(|unit| unit.as_str());
        let unit_first = captures.get(2).map(|unit| unit.as_str()).or(unit_second);
        let first = captures.get(1).and_then(|value| to_ml(value.as_str(), unit_first));
        let second = captures.get(3).and_then(|value| to_ml(value.as_str(), unit_second));
        if let (Some(first), Some(second)) = (first, second) {
            return VolumeRange { min_ml: Some(first.min(second)), max_ml: Some(first.max(second)) };
        }
    }

    if let Some(max_ml) = bounded(&patterns.ceiling, &numeric) {
        return VolumeRange { min_ml: None, max_ml: Some(max_ml) };
    }
    if let Some(min_ml) = bounded(&patterns.floor, &numeric) {
        return VolumeRange { min_ml: Some(min_ml), max_ml: None };
    }

    if let Some(ml) = patterns
        .millilitres
        .captures(&numeric)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse::<i32>().ok())
    {
        return VolumeRange { min_ml: Some(ml), max_ml: None };
    }

    if let Some(ml) = patterns.litres.captures(&numeric).and_then(|captures| {
        let value = captures.get(1)?;
        to_ml(value.as_str(), Some("l"))
    }) {
        return VolumeRange { min_ml: Some(ml), max_ml: None };
    }

    patterns
        .packaging
        .first_match(&prepare(text))
        .map(|packaging| VolumeRange { min_ml: packaging.min_ml, max_ml: packaging.max_ml })
        .unwrap_or_default()
}

fn bounded(pattern: &Pattern, text: &str) -> Option<i32> {
    let captures = pattern.captures(text)?;
    let value = captures.get(1)?;
    to_ml(value.as_str(), captures.get(2).map(|unit| unit.as_str()))
}

fn to_ml(raw: &str, unit: Option<&str>) -> Option<i32> {
    let amount = parse_amount(raw)?;
    let factor = match unit {
        Some("l" | "lt" | "lts" | "litro" | "litros") => Decimal::from(1000),
        Some("cl") => Decimal::from(10),
        _ => Decimal::ONE,
    };
    // Amounts too large to scale are no volume at all.
    amount
        .checked_mul(factor)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
}

#[cfg(test)]
mod tests {
    use super::{extract_volume, patterns};
    use crate::domain::intent::VolumeRange;

    fn range(min_ml: Option<i32>, max_ml: Option<i32>) -> VolumeRange {
        VolumeRange { min_ml, max_ml }
    }

    #[test]
    fn patterns_compile() {
        let patterns = patterns();
        for pattern in [
            &patterns.between,
            &patterns.ceiling,
            &patterns.floor,
            &patterns.millilitres,
            &patterns.litres,
        ] {
            assert!(pattern.is_valid(), "{}", pattern.source());
        }
        assert!(patterns.packaging.invalid_sources().is_empty());
    }

    #[test]
    fn extracts_explicit_and_categorical_volumes() {
        let cases = [
            ("cerveja de 600 ml", range(Some(600), None)),
            ("um vinho de 1,5 litros", range(Some(1500), None)),
            ("garrafa de 2 l", range(Some(2000), None)),
            ("entre 500 e 750 ml", range(Some(500), Some(750))),
            ("entre 1 l e 500 ml", range(Some(500), Some(1000))),
            ("até 350 ml", range(None, Some(350))),
            ("acima de 1 litro", range(Some(1000), None)),
            ("cerveja long neck", range(Some(330), Some(355))),
            ("uma latinha", range(Some(269), Some(473))),
            ("uma dose de whisky", range(Some(30), Some(60))),
            ("champagne magnum", range(Some(1000), None)),
            ("0,3335 l", range(Some(334), None)),
            ("até 30 dólares", range(None, None)),
            ("", range(None, None)),
        ];
        for (text, expected) in cases {
            assert_eq!(extract_volume(text), expected, "{text}");
        }
    }

    #[test]
    fn amounts_too_large_to_scale_are_ignored() {
        assert_eq!(extract_volume("vinho de 99999999999999999999999999 litros"), range(None, None));
        assert_eq!(
            extract_volume("cerveja acima de 99999999999999999999999999 litros"),
            range(None, None)
        );
    }
}
