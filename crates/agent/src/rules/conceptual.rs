use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;

use sommelier_core::knowledge::fixed_answer;
use sommelier_core::nlp::pattern::Pattern;

use super::{Rule, RuleOutcome, Turn};
use crate::llm::GuardedLlm;

const MIN_CHARS: usize = 8;

/// Catalog browsing, price talk and requests for a pick are not conceptual.
const BLOCKERS: &[&str] = &[
    r"\b(quais tipos de|que tipos de|tipos de bebidas|o que voces tem|o que tem pra beber|cardapio|catalogo)\b",
    r"\b(quanto custa|preco|em media|mais barato|mais caro|promocao)\b",
    r"\b(recomenda|indica|sugere|quero|preciso|me mostra|algo para|algo pro)\b",
];

const CONCEPTUAL: &str = r"\b(o que e|o que sao|como funciona|como e feito|como se faz|qual a diferenca|diferenca entre|para que serve|historia do|historia da)\b";

struct ConceptualPatterns {
    blockers: Vec<Pattern>,
    conceptual: Pattern,
}

fn patterns() -> &'static ConceptualPatterns {
    static PATTERNS: OnceLock<ConceptualPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ConceptualPatterns {
        blockers: BLOCKERS.iter().map(|source| Pattern::new(source)).collect(),
        conceptual: Pattern::new(CONCEPTUAL),
    })
}

pub fn is_conceptual_question(prepared: &str) -> bool {
    let patterns = patterns();
    prepared.chars().count() >= MIN_CHARS
        && !patterns.blockers.iter().any(|pattern| pattern.is_match(prepared))
        && patterns.conceptual.is_match(prepared)
}

pub(crate) fn educational_prompt(question: &str) -> String {
    format!(
        "Você é um sommelier profissional experiente.\n\
         Explique de forma EDUCATIVA, SIMPLES e CURTA a pergunta abaixo.\n\n\
         REGRAS OBRIGATÓRIAS:\n\
         - NÃO recomende bebidas\n\
         - NÃO cite marcas\n\
         - NÃO cite preços\n\
         - NÃO cite estoque\n\
         - NÃO faça propaganda\n\
         - NÃO invente informações\n\
         - Linguagem clara e amigável\n\
         - Máximo de 5 linhas\n\n\
         Pergunta do cliente:\n\"{question}\""
    )
}

/// "O que é um espumante brut?": fixed knowledge first, generated text second.
pub struct ConceptualQuestion {
    llm: GuardedLlm,
}

impl ConceptualQuestion {
    pub fn new(llm: GuardedLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Rule for ConceptualQuestion {
    fn name(&self) -> &'static str {
        "conceptual_question"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        is_conceptual_question(&turn.prepared)
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        if let Some(answer) = fixed_answer(turn.text) {
            return Ok(RuleOutcome::framed(answer));
        }
        Ok(match self.llm.generate("conceptual", &educational_prompt(turn.text)).await {
            Some(text) => RuleOutcome::framed(text),
            None => RuleOutcome::Continue,
        })
    }
}
