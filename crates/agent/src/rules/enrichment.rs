//! The catch-all rule: full intent extraction, fill-only macros, then search,
//! a provenance answer, or a clarifying question.

use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use sommelier_core::domain::intent::{ContextFilters, Intent, Occasion, QuestionKind, SensoryProfile};
use sommelier_core::knowledge::fixed_answer;
use sommelier_core::memory::ContextualMemory;
use sommelier_core::nlp::category::{CERVEZA, DESTILADOS, SEM_ALCOOL, VINOS, WHISKY};
use sommelier_core::nlp::occasion::{extract_event, mentions_meal};
use sommelier_core::nlp::pattern::PatternTable;

use super::conceptual::educational_prompt;
use super::{Rule, RuleOutcome, Turn};
use crate::conversation::{inherit_context, IntentAggregator};
use crate::llm::GuardedLlm;
use crate::provenance::ProvenanceResolver;

/// "Sem álcool" is checked first so "cerveja sem álcool" style mentions never read as spirits.
const CATEGORY_MACROS: &[(&str, &str)] = &[
    (r"\b(sem alcool|nao alcoolica|nao alcoolico|sin alcohol|zero alcool)\b", SEM_ALCOOL),
    (r"\b(chopp|chope|chop)\b", CERVEZA),
    (r"\b(destilado|destilados|bebida forte|bebidas fortes)\b", DESTILADOS),
];

const SENSORY_MACROS: &[(&str, SensoryProfile)] = &[
    (r"\b(marcante|marcantes)\b", SensoryProfile::Intense),
    (r"\b(delicado|delicada|delicados)\b", SensoryProfile::Light),
    (r"\b(equilibrado|equilibrada|balanceado|balanceada)\b", SensoryProfile::Balanced),
];

struct MacroPatterns {
    categories: PatternTable<&'static str>,
    sensory: PatternTable<SensoryProfile>,
}

fn macros() -> &'static MacroPatterns {
    static PATTERNS: OnceLock<MacroPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| MacroPatterns {
        categories: PatternTable::new(CATEGORY_MACROS),
        sensory: PatternTable::new(SENSORY_MACROS),
    })
}

/// Broad words the extractors leave alone. Never overrides a field already set.
fn apply_macros(intent: &mut Intent, text: &str, prepared: &str) {
    let macros = macros();
    if intent.category.is_none() {
        intent.category = macros.categories.first_match(prepared).map(str::to_string);
    }
    if intent.sensory.is_none() {
        intent.sensory = macros.sensory.first_match(prepared);
    }
    if intent.occasion.is_none() && mentions_meal(text) {
        intent.occasion = Some(Occasion::Meal);
    }
}

/// Named celebrations tag a scale for phrasing. The big ones also drop a
/// remembered category and start the context over.
fn apply_event(intent: &mut Intent, text: &str, memory: &mut ContextualMemory, now: DateTime<Utc>) {
    let Some(event) = extract_event(text) else {
        return;
    };
    intent.event_scale = event.scale();
    if !event.is_macro_event() {
        return;
    }

    if intent.category_inherited {
        intent.category = None;
        intent.category_inherited = false;
    }
    if intent.occasion.is_none() {
        intent.occasion = Some(event);
    }
    memory.clear(true, now);
    debug!(event_name = "sommelier.context.cleared", reason = "event", event = event.as_str(), "context cleared");
}

/// One refinement question instead of recommending from a bare category or occasion.
pub fn clarifying_question(intent: &Intent) -> Option<&'static str> {
    if let Some(category) = intent.category.as_deref() {
        return Some(match category {
            VINOS => "Prefere um vinho mais leve ou mais encorpado?",
            CERVEZA => "Você gosta mais de cervejas leves ou mais intensas?",
            WHISKY => "Prefere algo mais suave ou mais marcante?",
            _ => "Quer algo mais em conta ou uma opção mais especial?",
        });
    }

    intent.occasion.map(|occasion| match occasion {
        Occasion::Dinner | Occasion::Meal | Occasion::Lunch => {
            "Para esse jantar 😊 você prefere vinho, cerveja ou espumante?"
        }
        Occasion::Barbecue => "Para o churrasco 🔥 prefere cerveja, vinho ou algo mais forte?",
        Occasion::Gift => "É para presentear 🎁 prefere vinho, espumante ou destilado?",
        _ => "Que tipo de bebida você prefere?",
    })
}

pub struct Enrichment {
    aggregator: IntentAggregator,
    provenance: ProvenanceResolver,
    llm: GuardedLlm,
}

impl Enrichment {
    pub fn new(aggregator: IntentAggregator, provenance: ProvenanceResolver, llm: GuardedLlm) -> Self {
        Self { aggregator, provenance, llm }
    }

    /// "Qual o melhor whisky do mundo?" gets an explanation, never a product pick.
    async fn answer_abstract(&self, turn: &mut Turn<'_>, intent: &Intent) -> RuleOutcome {
        if let Some(category) = &intent.category {
            turn.state.memory.register(
                ContextFilters { category: Some(category.clone()), ..ContextFilters::default() },
                turn.now,
            );
        }
        if let Some(answer) = fixed_answer(turn.text) {
            return RuleOutcome::framed(answer);
        }
        match self.llm.generate("abstract", &educational_prompt(turn.text)).await {
            Some(text) => RuleOutcome::framed(text),
            None => RuleOutcome::Continue,
        }
    }
}

#[async_trait]
impl Rule for Enrichment {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    fn matches(&self, _turn: &Turn<'_>) -> bool {
        true
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        let mut intent = self.aggregator.process(turn.text, &mut turn.state.memory, turn.now).await;
        if intent.question == QuestionKind::Abstract {
            return Ok(self.answer_abstract(turn, &intent).await);
        }

        apply_macros(&mut intent, turn.text, &turn.prepared);
        inherit_context(&mut intent, &mut turn.state.memory, turn.now);
        apply_event(&mut intent, turn.text, &mut turn.state.memory, turn.now);

        if intent.has_filter() {
            turn.state.memory.register(intent.filters(), turn.now);
        }

        if intent.question == QuestionKind::Provenance {
            let answer = self.provenance.answer(intent.detected_product.as_ref()).await;
            return Ok(RuleOutcome::framed(answer));
        }
        if intent.is_searchable() {
            return Ok(RuleOutcome::Search(intent));
        }
        Ok(match clarifying_question(&intent) {
            Some(question) => RuleOutcome::framed(question),
            None => RuleOutcome::Continue,
        })
    }
}
