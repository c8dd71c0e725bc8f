use std::str::FromStr;
use std::sync::OnceLock;

use rust_decimal::Decimal;

use super::normalize::{normalize_numeric, replace_phrases};
use super::pattern::Pattern;
use crate::domain::intent::PriceRange;

const NUMERIC_REWRITES: &[(&str, &str)] = &[
    ("a mais de", "acima de"),
    ("mais de", "acima de"),
    ("mas de", "acima de"),
    ("por menos de", "menos de"),
    ("menos do que", "menos de"),
    ("a partir dos", "a partir de"),
];

const SPELLED: &[(&str, i64)] = &[
    ("cem", 100),
    ("cien", 100),
    ("noventa", 90),
    ("oitenta", 80),
    ("ochenta", 80),
    ("setenta", 70),
    ("sessenta", 60),
    ("sesenta", 60),
    ("cinquenta", 50),
    ("cincuenta", 50),
    ("quarenta", 40),
    ("cuarenta", 40),
    ("trinta", 30),
    ("treinta", 30),
    ("vinte", 20),
    ("veinte", 20),
    ("quinze", 15),
    ("quince", 15),
    ("dez", 10),
    ("diez", 10),
];

struct PricePatterns {
    currency: Pattern,
    between: Pattern,
    floor: Pattern,
    ceiling: Pattern,
    suffixed: Pattern,
    prefixed: Pattern,
    spelled: Pattern,
    cheap: Pattern,
    premium: Pattern,
}

#[cfg(test)]
impl PricePatterns {
    fn all(&self) -> [&Pattern; 9] {
        [
            &self.currency,
            &self.between,
            &self.floor,
            &self.ceiling,
            &self.suffixed,
            &self.prefixed,
            &self.spelled,
            &self.cheap,
            &self.premium,
        ]
    }
}

fn patterns() -> &'static PricePatterns {
    static PATTERNS: OnceLock<PricePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PricePatterns {
        currency: Pattern::new(r"\b(?:usd|us\$|u\$s|u\$d)"),
        between: Pattern::new(concat!(
            r"\b(?:entre|de|desde)\s+\$?\s*(\d+(?:[.,]\d+)*)\s*(?:dolares?)?\s*(?:e|a|y|ate|hasta)\s+\$?\s*(\d+(?:[.,]\d+)*)",
            r"(\s*(?:ml|cl|l|lt|lts|litro|litros|ano|anos|kg|g)\b)?"
        )),
        floor: Pattern::new(concat!(
            r"\b(?:acima de|a partir de|superior a|maior que|maior de|desde|minimo de)\s+\$?\s*(\d+(?:[.,]\d+)*)",
            r"(\s*(?:ml|cl|l|lt|lts|litro|litros|ano|anos|kg|g)\b)?"
        )),
        ceiling: Pattern::new(concat!(
            r"\b(?:ate|menos de|abaixo de|inferior a|no maximo|maximo de|menor que|menor de|hasta)\s+\$?\s*(\d+(?:[.,]\d+)*)",
            r"(\s*(?:ml|cl|l|lt|lts|litro|litros|ano|anos|kg|g)\b)?"
        )),
        suffixed: Pattern::new(r"(\d+(?:[.,]\d+)*)\s*(?:dolares\b|dolar\b|\$)"),
        prefixed: Pattern::new(r"(?:\$|\bdolares?)\s*(\d+(?:[.,]\d+)*)"),
        spelled: Pattern::new(concat!(
            r"\b(?:(acima de|a partir de|desde)|(ate|menos de|abaixo de|no maximo|hasta))?\s*",
            r"\b(cem|cien|noventa|oitenta|ochenta|setenta|sessenta|sesenta|cinquenta|cincuenta|quarenta|cuarenta|trinta|treinta|vinte|veinte|quinze|quince|dez|diez)\b",
            r"(\s*dolares?\b)?"
        )),
        cheap: Pattern::new(r"\b(barato|barata|baratinho|baratos|economico|economica|em conta)\b"),
        premium: Pattern::new(
            r"\b(caro|cara|caros|premium|top|especial|importado|importada|reserva)\b",
        ),
    })
}

/// Pulls a price range out of free text.
///
/// Colloquial anchors ("barato", "premium") only apply when no number was found,
/// and their defaults are business policy supplied by configuration.
#[derive(Clone, Debug)]
pub struct PriceExtractor {
    cheap_ceiling: Decimal,
    premium_floor: Decimal,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new(Decimal::from(10), Decimal::from(25))
    }
}

impl PriceExtractor {
    pub fn new(cheap_ceiling: Decimal, premium_floor: Decimal) -> Self {
        Self { cheap_ceiling, premium_floor }
    }

    pub fn extract(&self, text: &str) -> PriceRange {
        let patterns = patterns();
        let prepared = patterns.currency.replace_all(&normalize_numeric(text), " dolares ");
        let prepared = replace_phrases(&normalize_numeric(&prepared), NUMERIC_REWRITES);

        let mut range = numeric_range(patterns, &prepared);
        if range.is_empty() {
            range = spelled_range(patterns, &prepared);
        }
        if range.is_empty() {
            if patterns.cheap.is_match(&prepared) {
                range.max = Some(self.cheap_ceiling);
            } else if patterns.premium.is_match(&prepared) {
                range.min = Some(self.premium_floor);
            }
        }

        ordered(range)
    }
}

fn numeric_range(patterns: &PricePatterns, text: &str) -> PriceRange {
    for captures in patterns.between.captures_iter(text) {
        if captures.get(3).is_some() {
            continue;
        }
        let first = captures.get(1).and_then(|value| parse_amount(value.as_str()));
        let second = captures.get(2).and_then(|value| parse_amount(value.as_str()));
        if let (Some(first), Some(second)) = (first, second) {
            return PriceRange { min: Some(first), max: Some(second) };
        }
    }

    let mut range = PriceRange {
        min: first_unitless_amount(&patterns.floor, text),
        max: first_unitless_amount(&patterns.ceiling, text),
    };

    // A bare amount with a currency marker is read as a ceiling.
    if range.is_empty() {
        range.max = patterns
            .suffixed
            .captures(text)
            .or_else(|| patterns.prefixed.captures(text))
            .and_then(|captures| captures.get(1))
            .and_then(|value| parse_amount(value.as_str()));
    }

    range
}

fn first_unitless_amount(pattern: &Pattern, text: &str) -> Option<Decimal> {
    pattern
        .captures_iter(text)
        .into_iter()
        .filter(|captures| captures.get(2).is_none())
        .find_map(|captures| captures.get(1).and_then(|value| parse_amount(value.as_str())))
}

/// Spelled numbers need a comparator or a currency word; "dez anos" is not a price.
fn spelled_range(patterns: &PricePatterns, text: &str) -> PriceRange {
    let mut range = PriceRange::default();
    for captures in patterns.spelled.captures_iter(text) {
        let Some(value) = captures.get(3).and_then(|word| spelled_value(word.as_str())) else {
            continue;
        };
        if captures.get(1).is_some() {
            range.min = range.min.or(Some(value));
        } else if captures.get(2).is_some() || captures.get(4).is_some() {
            range.max = range.max.or(Some(value));
        }
    }
    range
}

fn spelled_value(word: &str) -> Option<Decimal> {
    SPELLED.iter().find(|(spelled, _)| *spelled == word).map(|(_, value)| Decimal::from(*value))
}

fn ordered(range: PriceRange) -> PriceRange {
    match (range.min, range.max) {
        (Some(min), Some(max)) if min > max => PriceRange { min: Some(max), max: Some(min) },
        _ => range,
    }
}

/// Parses `1.234,56`, `1,234.56`, `1234.56`, `12,5` and `1.234.567`.
///
/// With both separators present the later one is the decimal mark. A single
/// separator occurring once is a decimal mark; repeated, it groups thousands.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let canonical = match (raw.rfind('.'), raw.rfind(',')) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                raw.replace('.', "").replace(',', ".")
            } else {
                raw.replace(',', "")
            }
        }
        (None, Some(_)) if raw.matches(',').count() > 1 => raw.replace(',', ""),
        (None, Some(_)) => raw.replace(',', "."),
        (Some(_), None) if raw.matches('.').count() > 1 => raw.replace('.', ""),
        _ => raw.to_string(),
    };
    Decimal::from_str(&canonical).ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{parse_amount, patterns, PriceExtractor};
    use crate::domain::intent::PriceRange;

    fn dec(value: &str) -> Decimal {
        value.parse().expect("decimal literal")
    }

    fn range(min: Option<&str>, max: Option<&str>) -> PriceRange {
        PriceRange { min: min.map(dec), max: max.map(dec) }
    }

    #[test]
    fn patterns_compile() {
        for pattern in patterns().all() {
            assert!(pattern.is_valid(), "{}", pattern.source());
        }
    }

    #[test]
    fn parses_both_decimal_conventions() {
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("12,5"), Some(dec("12.5")));
        assert_eq!(parse_amount("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn extracts_ranges_and_bounds() {
        let extractor = PriceExtractor::default();
        let cases = [
            ("vinho até 30 dólares", range(None, Some("30"))),
            ("entre 20 e 60", range(Some("20"), Some("60"))),
            ("de 80 a 40 dolares", range(Some("40"), Some("80"))),
            ("whisky acima de 100", range(Some("100"), None)),
            ("mais de 50 dólares", range(Some("50"), None)),
            ("algo por menos de 15,50", range(None, Some("15.50"))),
            ("um de 200 dólares", range(None, Some("200"))),
            ("gin por US$ 45", range(None, Some("45"))),
            ("tem por $25?", range(None, Some("25"))),
            ("até cinquenta dólares", range(None, Some("50"))),
            ("acima de trinta", range(Some("30"), None)),
            ("um vinho barato", range(None, Some("10"))),
            ("um whisky premium", range(Some("25"), None)),
            ("barato até 40", range(None, Some("40"))),
            ("whisky 12 anos", range(None, None)),
            ("dez anos de idade", range(None, None)),
            ("cerveja até 500 ml", range(None, None)),
            ("entre 500 e 750 ml", range(None, None)),
            ("", range(None, None)),
        ];

        for (text, expected) in cases {
            assert_eq!(extractor.extract(text), expected, "{text}");
        }
    }

    #[test]
    fn colloquial_defaults_are_configurable() {
        let extractor = PriceExtractor::new(dec("8"), dec("40"));
        assert_eq!(extractor.extract("bem baratinho").max, Some(dec("8")));
        assert_eq!(extractor.extract("algo especial").min, Some(dec("40")));
    }

    proptest! {
        #[test]
        fn between_bounds_are_always_ordered(a in 1u32..5000, b in 1u32..5000, spanish in any::<bool>()) {
            let text = if spanish { format!("entre {a} y {b} dolares") } else { format!("entre {a} e {b}") };
            let extracted = PriceExtractor::default().extract(&text);
            let (low, high) = (a.min(b), a.max(b));
            prop_assert_eq!(extracted.min, Some(Decimal::from(low)));
            prop_assert_eq!(extracted.max, Some(Decimal::from(high)));
        }
    }
}
