//! Final touches applied to every catalog or knowledge answer.

use std::sync::OnceLock;

use sommelier_core::nlp::normalize::{contains_phrase, prepare};
use sommelier_core::nlp::pattern::{Pattern, PatternTable};

pub const EMPTY_REPLY: &str = "Posso te ajudar a escolher uma boa bebida 🍷";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Empathy {
    Fish,
    Barbecue,
    Dinner,
    PriceExtreme,
    Overview,
    Refinement,
    Special,
}

const EMPATHY: &[(&str, Empathy)] = &[
    (r"\b(peixe|pescado|mariscos)\b", Empathy::Fish),
    (r"\b(churrasco|asado)\b", Empathy::Barbecue),
    (r"\b(janta|jantar|cena)\b", Empathy::Dinner),
    (r"\bmais (caro|cara|barato|barata)\b", Empathy::PriceExtreme),
    (r"\b(media|em geral|normalmente)\b", Empathy::Overview),
    (r"\b(outro|outra|mais um|mais uma|seguinte)\b", Empathy::Refinement),
    (r"\b(especial|diferente|melhor)\b", Empathy::Special),
];

const HESITATION: &str =
    r"\b(bom|boa|vale a pena|recomenda|indica|confiavel|seguro|melhor opcao|qual escolher)\b";

struct HumanizePatterns {
    empathy: PatternTable<Empathy>,
    hesitation: Pattern,
    blanks: Pattern,
    space_before_punctuation: Pattern,
    blank_lines: Pattern,
}

fn patterns() -> &'static HumanizePatterns {
    static PATTERNS: OnceLock<HumanizePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HumanizePatterns {
        empathy: PatternTable::new(EMPATHY),
        hesitation: Pattern::new(HESITATION),
        blanks: Pattern::new(r"[ \t]+"),
        space_before_punctuation: Pattern::new(r"[ \t]+([,.!?])"),
        blank_lines: Pattern::new(r"\n{3,}"),
    })
}

pub fn empathy_prefix(message: &str) -> Option<&'static str> {
    let prepared = prepare(message);
    let cue = patterns().empathy.first_match(&prepared)?;
    Some(match cue {
        Empathy::Fish => "Que legal 😄 Peixe é uma ótima escolha.",
        Empathy::Barbecue => "Ah, churrasco é sempre um bom momento 🔥",
        Empathy::Dinner => "Boa! Um jantar pede algo que combine bem com a comida 🍽️",
        Empathy::PriceExtreme if prepared.contains("mais car") => {
            "Se a ideia é algo realmente especial e marcante 🍷"
        }
        Empathy::PriceExtreme => "Se você quer algo simples e em conta, sem erro 😉",
        Empathy::Overview => "Pra você ter uma noção geral 🍷",
        Empathy::Refinement => "Claro 😊 Vamos refinar um pouco mais.",
        Empathy::Special => "Perfeito 😌 Vamos pensar em algo mais especial então.",
    })
}

/// Reassurance for customers asking whether an option is any good.
pub fn confidence_prefix(message: &str) -> Option<&'static str> {
    let prepared = prepare(message);
    if !patterns().hesitation.is_match(&prepared) {
        return None;
    }

    Some(if contains_phrase(&prepared, "vale") {
        "Vale sim, é uma opção bem consistente 🍷"
    } else if contains_phrase(&prepared, "recomenda") || contains_phrase(&prepared, "indica") {
        "Se você quer ir sem erro, essa é uma escolha bem segura 👍"
    } else if contains_phrase(&prepared, "bom") || contains_phrase(&prepared, "boa") {
        "É sim, bastante apreciado por quem costuma escolher esse estilo 🍷"
    } else {
        "É uma opção bem confiável e equilibrada 👌"
    })
}

/// Whitespace and punctuation cleanup that keeps list line breaks.
pub fn tidy(text: &str) -> String {
    if text.trim().is_empty() {
        return EMPTY_REPLY.to_string();
    }

    let patterns = patterns();
    let text = patterns.blanks.replace_all(text, " ");
    let text = patterns.space_before_punctuation.replace_all(&text, "$1");
    let text = patterns.blank_lines.replace_all(&text, "\n\n");
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Empathy first, then reassurance on top, then cleanup.
pub fn finalize(message: &str, reply: &str) -> String {
    let mut framed = reply.to_string();
    if let Some(prefix) = empathy_prefix(message) {
        framed = format!("{prefix}\n\n{framed}");
    }
    if let Some(prefix) = confidence_prefix(message) {
        framed = format!("{prefix}\n\n{framed}");
    }
    tidy(&framed)
}
