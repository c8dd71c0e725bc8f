use std::sync::OnceLock;

use super::normalize::prepare;
use super::pattern::Pattern;

const ABSTRACT: &[&str] = &[
    r"\b(?:qual|cual)\s+(?:e\s+|es\s+)?(?:o|a|el|la)\s+melhor\b",
    r"\b(?:quem|quien)\s+(?:criou|inventou|invento|creo)\b",
    r"\bhistoria\b",
    r"\bquando surgiu\b",
    r"\b(?:explica|explique|explicame|me conta)\b",
    r"\bcomo\s+(?:e|se|es)\s+(?:feito|feita|faz|hace|hecho)\b",
];

const PROVENANCE: &str = r"\b(procedencia|procedente|origem|origen|de onde (?:vem|e)|de donde (?:viene|es)|pais de origem|pais de origen|feito em|fabricado em|produzido em|hecho en|fabricado en)\b";

const PROVENANCE_SUPPRESSORS: &str = r"\b(historia|quem inventou|quando surgiu)\b";

struct QuestionPatterns {
    abstract_forms: Vec<Pattern>,
    provenance: Pattern,
    suppressors: Pattern,
}

fn patterns() -> &'static QuestionPatterns {
    static PATTERNS: OnceLock<QuestionPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| QuestionPatterns {
        abstract_forms: ABSTRACT.iter().map(|source| Pattern::new(source)).collect(),
        provenance: Pattern::new(PROVENANCE),
        suppressors: Pattern::new(PROVENANCE_SUPPRESSORS),
    })
}

/// "What is the best...", "who invented...", "explain...": never answered from the catalog.
pub fn is_abstract_question(text: &str) -> bool {
    let prepared = prepare(text);
    patterns().abstract_forms.iter().any(|pattern| pattern.is_match(&prepared))
}

/// Origin questions about a product; history questions are not provenance.
pub fn is_provenance_question(text: &str) -> bool {
    let prepared = prepare(text);
    let patterns = patterns();
    patterns.provenance.is_match(&prepared) && !patterns.suppressors.is_match(&prepared)
}
