//! Text policies that keep the assistant on topic and its generated text honest.
//!
//! Every check works on prepared text (see `sommelier_core::nlp::normalize::prepare`).

use std::sync::OnceLock;

use sommelier_core::nlp::category::CategoryClassifier;
use sommelier_core::nlp::normalize::{normalize, prepare};
use sommelier_core::nlp::occasion::{extract_event, extract_occasion};
use sommelier_core::nlp::pattern::Pattern;
use sommelier_core::nlp::sensory::extract_sensory;
use sommelier_core::nlp::volume::extract_volume;

pub const OFF_TOPIC_REPLY: &str = "Posso te ajudar apenas com bebidas do Shopping Mapy 🍷";

const PERSONAL: &[&str] = &[
    r"\bquem (e|eh) (voce|vc)\b",
    r"\b(seu|teu) nome\b",
    r"\b(sua|tua) idade\b",
    r"\bquantos anos (voce|vc|tu)\b",
    r"\b(voce|vc) (namora|e casad[oa]|e solteir[oa])\b",
    r"\b(namora|namorad[oa]|casad[oa]|solteir[oa])\b",
    r"\b(onde )?(voce|vc) trabalha\b",
    r"\bo que (voce|vc) faz\b",
    r"\b(ia|inteligencia artificial|openai|chatgpt|gpt)\b",
    r"\bcomo (voce|vc) funciona\b",
    r"\bseu sistema\b",
    r"\bvoce e (um )?(robo|bot|humano|humana|pessoa)\b",
];

const CONTINUATION: &[&str] = &[
    r"\b(algo|algum|alguma|outro|outra|outros|outras)\b",
    r"\b(me recomenda|me indica|me sugere)\b",
    r"\b(qualquer um|qualquer uma|qualquer coisa)\b",
    r"\b(mais opcoes|outras opcoes|seguinte|proximo|proxima)\b",
    r"\bmais\b",
    r"\b(pode ser|tanto faz|assim mesmo)\b",
    r"^(sim|ok|dale|isso|esse|essa|beleza|blz)$",
];

/// A price written with digits: "ate 30", "entre 20 e 40", "30 dolares".
const EXPLICIT_PRICE: &str = r"\b(acima de|mais de|menos de|abaixo de|a partir de|ate|entre|por)\s*\d+|\d+\s*(dolares|dolar|usd|reais|pesos|guaranies)\b";

const NEGATION: &str = r"^(nao|no|nope|nenhum|nenhuma|nao quero|nao obrigado|nao obrigada|no gracias)$";

/// Stock phrases that mean the model declined or broke character.
const NON_ANSWERS: &[&str] = &[
    "nao tenho informacoes",
    "nao tenho informacao",
    "como uma ia",
    "sou uma ia",
    "como assistente",
    "nao posso ajudar",
    "nao encontrei",
    "modelo de linguagem",
    "as an ai",
    "i don't have information",
    "i do not have information",
];

struct GuardPatterns {
    personal: Vec<Pattern>,
    continuation: Vec<Pattern>,
    explicit_price: Pattern,
    negation: Pattern,
}

fn patterns() -> &'static GuardPatterns {
    static PATTERNS: OnceLock<GuardPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| GuardPatterns {
        personal: PERSONAL.iter().map(|source| Pattern::new(source)).collect(),
        continuation: CONTINUATION.iter().map(|source| Pattern::new(source)).collect(),
        explicit_price: Pattern::new(EXPLICIT_PRICE),
        negation: Pattern::new(NEGATION),
    })
}

/// Questions about the assistant itself. A beverage mention always wins.
pub fn is_personal_question(text: &str) -> bool {
    let prepared = prepare(text);
    if prepared.is_empty() || CategoryClassifier::shared().classify(text).is_some() {
        return false;
    }
    patterns().personal.iter().any(|pattern| pattern.is_match(&prepared))
}

pub fn is_continuation(text: &str) -> bool {
    let prepared = prepare(text);
    !prepared.is_empty() && patterns().continuation.iter().any(|pattern| pattern.is_match(&prepared))
}

/// A price bound written with digits, as opposed to "barato" or "especial".
pub fn mentions_explicit_price(text: &str) -> bool {
    patterns().explicit_price.is_match(&prepare(text))
}

/// Whether the message brings a filter of its own. Colloquial "barato" does not count.
pub fn introduces_new_filter(text: &str) -> bool {
    mentions_explicit_price(text)
        || !extract_volume(text).is_empty()
        || extract_sensory(text).is_some()
        || extract_occasion(text).is_some()
        || extract_event(text).is_some()
        || CategoryClassifier::shared().classify(text).is_some()
}

pub fn is_bare_negation(text: &str) -> bool {
    patterns().negation.is_match(&prepare(text))
}

/// Generated text that dodges the question is discarded rather than shown.
pub fn is_non_answer(generated: &str) -> bool {
    let lowered = generated.to_lowercase();
    let normalized = normalize(generated);
    NON_ANSWERS
        .iter()
        .any(|phrase| normalized.contains(phrase) || lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::{
        introduces_new_filter, is_bare_negation, is_continuation, is_non_answer,
        is_personal_question, patterns,
    };

    struct Case {
        text: &'static str,
        expected: bool,
    }

    #[test]
    fn patterns_compile() {
        let patterns = patterns();
        assert!(patterns.personal.iter().all(|pattern| pattern.is_valid()));
        assert!(patterns.continuation.iter().all(|pattern| pattern.is_valid()));
        assert!(patterns.explicit_price.is_valid());
        assert!(patterns.negation.is_valid());
    }

    #[test]
    fn personal_questions_unless_a_beverage_is_named() {
        let cases = [
            Case { text: "Quem é você?", expected: true },
            Case { text: "qual o seu nome", expected: true },
            Case { text: "você é uma IA?", expected: true },
            Case { text: "como vc funciona", expected: true },
            Case { text: "a IA recomenda qual vinho?", expected: false },
            Case { text: "quero um gin", expected: false },
            Case { text: "vinho ideal pra quem é casado há 10 anos", expected: false },
        ];
        for case in cases {
            assert_eq!(is_personal_question(case.text), case.expected, "{}", case.text);
        }
    }

    #[test]
    fn continuation_markers() {
        let cases = [
            Case { text: "e mais barato?", expected: true },
            Case { text: "me indica outro", expected: true },
            Case { text: "ok", expected: true },
            Case { text: "ok, mas quero whisky", expected: false },
            Case { text: "vinho tinto", expected: false },
        ];
        for case in cases {
            assert_eq!(is_continuation(case.text), case.expected, "{}", case.text);
        }
    }

    #[test]
    fn new_filters_block_continuation_reuse() {
        let cases = [
            Case { text: "e mais barato?", expected: false },
            Case { text: "outro até 20", expected: true },
            Case { text: "algum por 15 dólares", expected: true },
            Case { text: "mais algum de 1 litro", expected: true },
            Case { text: "outro mais doce", expected: true },
            Case { text: "algo pro churrasco", expected: true },
            Case { text: "outra cerveja", expected: true },
            Case { text: "me indica outro", expected: false },
        ];
        for case in cases {
            assert_eq!(introduces_new_filter(case.text), case.expected, "{}", case.text);
        }
    }

    #[test]
    fn negations_are_bare_only() {
        assert!(is_bare_negation("Não"));
        assert!(is_bare_negation("não, obrigado!"));
        assert!(!is_bare_negation("não gosto de vinho doce"));
    }

    #[test]
    fn stock_refusals_are_detected() {
        assert!(is_non_answer("Como uma IA, não posso opinar."));
        assert!(is_non_answer("Infelizmente não tenho informações sobre isso."));
        assert!(!is_non_answer("Um espumante brut combina com frutos do mar 🍾"));
    }
}
