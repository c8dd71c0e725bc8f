use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use sommelier_core::domain::intent::Intent;

use super::enrichment::clarifying_question;
use super::{Rule, RuleOutcome, Turn};
use crate::guardrails::{
    introduces_new_filter, is_bare_negation, is_continuation, is_personal_question, OFF_TOPIC_REPLY,
};

/// Questions about the assistant itself get a fixed redirect.
pub struct PersonalGuard;

#[async_trait]
impl Rule for PersonalGuard {
    fn name(&self) -> &'static str {
        "personal_guard"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        is_personal_question(turn.text)
    }

    async fn handle(&self, _turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        Ok(RuleOutcome::plain(OFF_TOPIC_REPLY))
    }
}

/// "Outro", "algo mais", "ok": repeat the last search with the remembered filters.
///
/// A bare "não" wipes the context and lets the rest of the chain answer.
pub struct VagueContinuation;

#[async_trait]
impl Rule for VagueContinuation {
    fn name(&self) -> &'static str {
        "vague_continuation"
    }

    fn matches(&self, turn: &Turn<'_>) -> bool {
        if !turn.state.memory.has_valid_context(turn.now) {
            return false;
        }
        is_bare_negation(turn.text)
            || (is_continuation(turn.text) && !introduces_new_filter(turn.text))
    }

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome> {
        if is_bare_negation(turn.text) {
            turn.state.memory.clear(true, turn.now);
            debug!(event_name = "sommelier.context.cleared", reason = "negation", "context cleared");
            return Ok(RuleOutcome::Continue);
        }

        let Some(filters) = turn.state.memory.recall(turn.now) else {
            return Ok(RuleOutcome::Continue);
        };
        let intent = Intent::from_filters(filters);
        if intent.is_searchable() {
            return Ok(RuleOutcome::Search(intent));
        }
        // A remembered bare category is refined, never searched.
        Ok(match clarifying_question(&intent) {
            Some(question) => RuleOutcome::framed(question),
            None => RuleOutcome::Continue,
        })
    }
}
