use std::sync::OnceLock;

use super::normalize::prepare;
use super::pattern::{Pattern, PatternTable};
use crate::domain::intent::Occasion;

const OCCASIONS: &[(&str, Occasion)] = &[
    (r"\b(presente|presentes|regalo|presentear|presentar|lembrancinha)\b", Occasion::Gift),
    (r"\b(festa|fiesta|cumple|cumpleanos|aniversario|niver)\b", Occasion::Party),
    (r"\b(churrasco|churras|asado|parrilla)\b", Occasion::Barbecue),
    (r"\b(jantar|janta|cena)\b", Occasion::Dinner),
];

/// Named events, checked in order; "ceia de natal" must win over a plain "ceia".
const EVENTS: &[(&str, Occasion)] = &[
    (r"\b(reveillon|ano novo|ano nuevo|virada do ano)\b", Occasion::NewYear),
    (r"\b(natal|navidad|ceia de natal)\b", Occasion::Christmas),
    (r"\b(aniversario|niver|cumpleanos)\b", Occasion::Birthday),
    (r"\b(casamento|boda|bodas)\b", Occasion::Wedding),
    (r"\b(formatura|colacao|graduacao|graduacion)\b", Occasion::Graduation),
    (r"\b(confraternizacao|fim de ano da empresa)\b", Occasion::CorporateParty),
    (r"\b(churrasco|assado|asado|parrilla)\b", Occasion::Barbecue),
    (r"\b(jantar|janta|ceia)\b", Occasion::Dinner),
    (r"\b(almoco|almuerzo)\b", Occasion::Lunch),
    (r"\b(evento|festa|comemoracao|celebracao)\b", Occasion::Event),
];

const MEAL: &str = r"\b(carne|churrasco|jantar|almoco|refeicao|comida)\b";

struct OccasionPatterns {
    occasions: PatternTable<Occasion>,
    events: PatternTable<Occasion>,
    meal: Pattern,
}

fn patterns() -> &'static OccasionPatterns {
    static PATTERNS: OnceLock<OccasionPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| OccasionPatterns {
        occasions: PatternTable::new(OCCASIONS),
        events: PatternTable::new(EVENTS),
        meal: Pattern::new(MEAL),
    })
}

/// Gift, party, barbecue or dinner; first match wins.
pub fn extract_occasion(text: &str) -> Option<Occasion> {
    patterns().occasions.first_match(&prepare(text))
}

/// Named celebration, including the ones [`Occasion::is_macro_event`] treats as overriding.
pub fn extract_event(text: &str) -> Option<Occasion> {
    patterns().events.first_match(&prepare(text))
}

pub fn mentions_meal(text: &str) -> bool {
    patterns().meal.is_match(&prepare(text))
}
