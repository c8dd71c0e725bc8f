use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Common speech-to-text spellings and plurals folded onto the alias vocabulary.
const SPEECH_TOKENS: &[(&str, &str)] = &[
    ("uisque", "whisky"),
    ("uiski", "whisky"),
    ("uisky", "whisky"),
    ("viski", "whisky"),
    ("wisky", "whisky"),
    ("whiskie", "whisky"),
    ("cervejas", "cerveja"),
    ("cervezas", "cerveza"),
    ("vinhos", "vinho"),
    ("licores", "licor"),
    ("espumantes", "espumante"),
    ("gim", "gin"),
];

/// Words that never identify a product in a price or provenance question.
const PRODUCT_QUERY_STOPWORDS: &[&str] = &[
    "a", "as", "o", "os", "um", "uma", "uns", "umas", "el", "la", "los", "las", "de", "do", "da",
    "dos", "das", "del", "e", "y", "em", "en", "no", "na", "por", "para", "pra", "com", "que",
    "qual", "cual", "quanto", "quanta", "cuanto", "cuanta", "custa", "custam", "cuesta", "cuestan",
    "preco", "precio", "valor", "price", "sale", "sai", "me", "diz", "diga", "fala", "sabe",
    "saber", "voce", "vc", "tem", "tiene", "ha", "es", "esta", "este", "esse", "essa",
    "procedencia", "origem", "origen", "onde", "donde", "vem", "viene", "pais", "feito",
    "fabricado", "produzido", "hecho", "dolares", "dolar", "usd", "reais", "favor", "ai", "aqui",
    "hoje", "agora",
];

/// Lowercases, strips diacritics, keeps only `[a-z0-9 ]` and collapses whitespace.
pub fn normalize(raw: &str) -> String {
    fold(raw, |ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
}

/// Same as [`normalize`] but keeps `.`, `,` and `$` so amounts keep their separators.
pub fn normalize_numeric(raw: &str) -> String {
    fold(raw, |ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '.' | ',' | '$'))
}

fn fold(raw: &str, keep: impl Fn(char) -> bool) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.nfd().flat_map(char::to_lowercase) {
        if is_combining_mark(ch) {
            continue;
        }
        if keep(ch) {
            if pending_space && !output.is_empty() {
                output.push(' ');
            }
            pending_space = false;
            output.push(ch);
        } else {
            pending_space = true;
        }
    }

    output
}

/// Rewrites transcription variants token by token. Expects normalized input.
pub fn canonicalize_speech(normalized: &str) -> String {
    normalized
        .split_whitespace()
        .map(|token| {
            SPEECH_TOKENS
                .iter()
                .find(|(variant, _)| *variant == token)
                .map(|(_, canonical)| *canonical)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize + canonicalize; the form every keyword matcher works on.
pub fn prepare(raw: &str) -> String {
    canonicalize_speech(&normalize(raw))
}

/// Replaces whole-word phrases. Expects normalized input.
pub fn replace_phrases(normalized: &str, rewrites: &[(&str, &str)]) -> String {
    let mut padded = format!(" {normalized} ");
    for (from, to) in rewrites {
        let needle = format!(" {from} ");
        let replacement = format!(" {to} ");
        if replacement.contains(&needle) {
            padded = padded.replace(&needle, &replacement);
            continue;
        }
        while padded.contains(&needle) {
            padded = padded.replace(&needle, &replacement);
        }
    }
    padded.trim().to_string()
}

pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    format!(" {normalized} ").contains(&format!(" {phrase} "))
}

pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Reduces a free-text question to the words that could name a product.
pub fn product_query(raw: &str) -> String {
    prepare(raw)
        .split_whitespace()
        .filter(|token| !PRODUCT_QUERY_STOPWORDS.contains(token))
        .filter(|token| !token.chars().all(|ch| ch.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}
