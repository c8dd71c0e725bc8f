use std::sync::OnceLock;

use tracing::{info, warn};

use sommelier_core::nlp::normalize::prepare;
use sommelier_core::nlp::pattern::Pattern;

use crate::guardrails::is_non_answer;
use crate::llm::GuardedLlm;

/// "bebida" is shared with Portuguese, so it does not count as a Spanish cue.
const SPANISH_CUES: &str = r"\b(hola|quiero|busco|precio|opcion|opciones|recomienda|recomiendas)\b";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    Portuguese,
    Spanish,
}

fn spanish_cues() -> &'static Pattern {
    static PATTERN: OnceLock<Pattern> = OnceLock::new();
    PATTERN.get_or_init(|| Pattern::new(SPANISH_CUES))
}

pub fn detect_language(text: &str) -> Language {
    if spanish_cues().is_match(&prepare(text)) {
        Language::Spanish
    } else {
        Language::Portuguese
    }
}

fn prompt(language: Language, question: &str) -> String {
    match language {
        Language::Portuguese => format!(
            "Você é a Sommelier Virtual do Shopping Mapy.\n\n\
             REGRAS ABSOLUTAS:\n\
             - Fale SOMENTE sobre bebidas.\n\
             - NÃO invente produtos, marcas, preços ou volumes.\n\
             - Se a pergunta não for clara, peça mais detalhes.\n\
             - Responda curto, humano e simpático.\n\
             - Máximo de 2 emojis.\n\
             - NÃO faça a saudação padrão do shopping.\n\n\
             Pergunta do cliente:\n\"{question}\""
        ),
        Language::Spanish => format!(
            "Eres el Sommelier Virtual del Shopping Mapy.\n\n\
             REGLAS ABSOLUTAS:\n\
             - Habla SOLO sobre bebidas.\n\
             - NO inventes productos, marcas, precios ni volúmenes.\n\
             - Si la pregunta no es clara, pide más detalles.\n\
             - Responde de forma breve, humana y amable.\n\
             - Máximo 2 emojis.\n\
             - NO hagas el saludo estándar del shopping.\n\n\
             Pregunta del cliente:\n\"{question}\""
        ),
    }
}

/// Last resort of the chain: constrained generation, else the caller's canned text.
#[derive(Clone)]
pub struct FallbackResponder {
    llm: GuardedLlm,
}

impl FallbackResponder {
    pub fn new(llm: GuardedLlm) -> Self {
        Self { llm }
    }

    pub async fn respond(&self, text: &str, canned: &str) -> String {
        let question = text.trim();
        if question.is_empty() {
            return canned.to_string();
        }

        let language = detect_language(question);
        match self.llm.generate("fallback", &prompt(language, question)).await {
            Some(generated) if is_non_answer(&generated) => {
                warn!(event_name = "sommelier.fallback.rejected", "generated reply dodged the question");
                canned.to_string()
            }
            Some(generated) => {
                info!(event_name = "sommelier.fallback.generated", ?language, "fallback reply generated");
                generated
            }
            None => canned.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{detect_language, FallbackResponder, Language, SPANISH_CUES};
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::GuardedLlm;
    use sommelier_core::nlp::pattern::Pattern;

    fn responder(replies: Vec<anyhow::Result<String>>) -> (FallbackResponder, Arc<ScriptedLlm>) {
        let script = Arc::new(ScriptedLlm::replying(replies));
        let llm = GuardedLlm::new(script.clone(), Duration::from_secs(5), 0);
        (FallbackResponder::new(llm), script)
    }

    #[test]
    fn patterns_compile() {
        assert!(Pattern::new(SPANISH_CUES).is_valid());
    }

    #[test]
    fn spanish_cues_pick_the_spanish_prompt() {
        assert_eq!(detect_language("Hola, busco un vino"), Language::Spanish);
        assert_eq!(detect_language("¿Qué opción me recomiendas?"), Language::Spanish);
        assert_eq!(detect_language("quero uma bebida leve"), Language::Portuguese);
    }

    #[tokio::test]
    async fn accepted_generation_is_returned() {
        let (fallback, script) = responder(vec![Ok("Um rosé gelado vai bem 🍷".to_string())]);
        assert_eq!(fallback.respond("algo pra tarde de sol", "canned").await, "Um rosé gelado vai bem 🍷");
        let prompts = script.prompts.lock().expect("prompts");
        assert!(prompts[0].starts_with("Você é a Sommelier Virtual"));
    }

    #[tokio::test]
    async fn spanish_questions_get_the_spanish_prompt() {
        let (fallback, script) = responder(vec![Ok("Claro 🍷".to_string())]);
        fallback.respond("quiero algo para la tarde", "canned").await;
        let prompts = script.prompts.lock().expect("prompts");
        assert!(prompts[0].starts_with("Eres el Sommelier Virtual"));
    }

    #[tokio::test]
    async fn non_answers_and_failures_use_the_canned_text() {
        let (fallback, _) = responder(vec![Ok("Como uma IA, não posso opinar.".to_string())]);
        assert_eq!(fallback.respond("e aí?", "canned").await, "canned");

        let (fallback, _) = responder(vec![]);
        assert_eq!(fallback.respond("e aí?", "canned").await, "canned");
    }
}
