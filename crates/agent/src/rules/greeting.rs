use anyhow::Result;
use async_trait::async_trait;
use chrono::Timelike;
use chrono_tz::Tz;

use sommelier_core::nlp::normalize::tokenize;

use super::{Rule, RuleOutcome, Turn};

const TRIGGERS: &[&str] = &["oi", "ola", "oie", "bom dia", "boa tarde", "boa noite"];

/// Longer openers ("oi, quero um vinho até 30") carry a request and skip the greeting.
const MAX_GREETING_TOKENS: usize = 3;

pub struct Greeting {
    tz: Tz,
}

impl Greeting {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn salutation(&self, turn: &Turn<'_>) -> &'static str {
        match turn.now.with_timezone(&self.tz).hour() {
            0..=11 => "Ótimo dia",
            12..=17 => "Ótima tarde",
            _ => "Ótima noite",
        }
    }
}

pub fn is_greeting(prepared: &str) -> bool {
    if prepared.is_empty() || tokenize(prepared).len() > MAX_GREETING_TOKENS {
        return false;
    }
    TRIGGERS.iter().any(|trigger| {
        prepared == *trigger
            || prepared.strip_prefix(trigger).is_some_and(|rest| rest.starts_with(' '))
    })
}

#[async_trait]
impl Rule for Greeting {
    fn name(&self) -> &'static str {
        "greeting"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        is_greeting(&turn.prepared)
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        turn.state.memory.clear(false, turn.now);
        Ok(RuleOutcome::plain(format!(
            "{}! 🍷 Posso te ajudar a escolher uma bebida?",
            self.salutation(turn)
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sommelier_core::nlp::normalize::prepare;
    use sommelier_core::session::SessionState;

    use super::{is_greeting, Greeting};
    use crate::rules::{Rule, RuleOutcome, Turn};

    struct Case {
        text: &'static str,
        expected: bool,
    }

    #[test]
    fn greeting_detection() {
        let cases = [
            Case { text: "oi", expected: true },
            Case { text: "Olá!", expected: true },
            Case { text: "Oi, tudo bem?", expected: true },
            Case { text: "Boa noite!", expected: true },
            Case { text: "oie", expected: true },
            Case { text: "oito vinhos", expected: false },
            Case { text: "oi, quero um vinho até 30", expected: false },
            Case { text: "", expected: false },
        ];
        for case in cases {
            assert_eq!(is_greeting(&prepare(case.text)), case.expected, "{}", case.text);
        }
    }

    #[tokio::test]
    async fn salutation_follows_local_hour() {
        let rule = Greeting::new(chrono_tz::America::Asuncion);
        let cases = [
            (12, "Ótimo dia! 🍷 Posso te ajudar a escolher uma bebida?"),
            (16, "Ótima tarde! 🍷 Posso te ajudar a escolher uma bebida?"),
            (23, "Ótima noite! 🍷 Posso te ajudar a escolher uma bebida?"),
        ];

        for (utc_hour, expected) in cases {
            let now = Utc.with_ymd_and_hms(2025, 6, 10, utc_hour, 0, 0).single().expect("timestamp");
            let mut state = SessionState::default();
            let mut turn = Turn::new("oi", &mut state, now);
            assert!(rule.matches(&turn));
            let outcome = rule.handle(&mut turn).await.expect("greeting");
            assert_eq!(outcome, RuleOutcome::plain(expected));
        }
    }
}
