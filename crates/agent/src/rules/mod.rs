//! Ordered dialogue rules.
//!
//! A message walks the chain top to bottom and the first rule that matches and
//! produces an outcome answers it. `RuleOutcome::Continue` lets a matched rule
//! decline (a conceptual question without any answer source, a bare "não"),
//! and `RuleOutcome::Search` hands a finished intent straight to catalog search.

pub mod conceptual;
pub mod enrichment;
pub mod fallback;
pub mod greeting;
pub mod guards;
pub mod pricing;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use sommelier_core::config::AssistantConfig;
use sommelier_core::domain::intent::{EventScale, Intent};
use sommelier_core::nlp::normalize::prepare;
use sommelier_core::session::SessionState;
use sommelier_db::repositories::{
    CatalogRepository, InteractionKind, InteractionRepository, NewInteraction,
};

use crate::conversation::IntentAggregator;
use crate::humanize;
use crate::llm::GuardedLlm;
use crate::provenance::ProvenanceResolver;
use crate::reply::{product_list, NO_RESULTS};
use crate::search::{CatalogSearch, SearchLimits};

use conceptual::ConceptualQuestion;
use enrichment::Enrichment;
use fallback::FallbackResponder;
use greeting::Greeting;
use guards::{PersonalGuard, VagueContinuation};
use pricing::{PriceExtreme, PriceStatistics, ProductPrice};

/// Canned text when nothing in the chain could answer and generation is unavailable.
pub const CLARIFY_PREFERENCE: &str =
    "Poderia me dizer se prefere algo doce, leve, encorpado ou mais forte?";

/// One customer message together with the session it mutates.
pub struct Turn<'a> {
    pub text: &'a str,
    pub prepared: String,
    pub state: &'a mut SessionState,
    pub now: DateTime<Utc>,
}

impl<'a> Turn<'a> {
    pub fn new(text: &'a str, state: &'a mut SessionState, now: DateTime<Utc>) -> Self {
        Self { text, prepared: prepare(text), state, now }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Final text; `finalize` adds empathy and reassurance framing.
    Reply { text: String, finalize: bool },
    Search(Intent),
    Continue,
}

impl RuleOutcome {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Reply { text: text.into(), finalize: false }
    }

    pub fn framed(text: impl Into<String>) -> Self {
        Self::Reply { text: text.into(), finalize: true }
    }
}

#[async_trait]
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, turn: &Turn<'_>) -> bool;

    async fn handle(&self, turn: &mut Turn<'_>) -> Result<RuleOutcome>;
}

pub struct RuleChain {
    rules: Vec<Box<dyn Rule>>,
    search: CatalogSearch,
    fallback: FallbackResponder,
    interactions: Option<Arc<dyn InteractionRepository>>,
}

impl RuleChain {
    /// The standard chain, in priority order.
    pub fn new(catalog: Arc<dyn CatalogRepository>, llm: GuardedLlm, config: &AssistantConfig) -> Self {
        let aggregator = IntentAggregator::new(catalog.clone(), config);
        let provenance = ProvenanceResolver::new(llm.clone(), catalog.clone());
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(Greeting::new(config.tz())),
            Box::new(PriceStatistics::new(catalog.clone(), aggregator.clone())),
            Box::new(PriceExtreme::new(catalog.clone())),
            Box::new(ProductPrice::new(catalog.clone(), config.product_match_threshold)),
            Box::new(PersonalGuard),
            Box::new(VagueContinuation),
            Box::new(ConceptualQuestion::new(llm.clone())),
            Box::new(Enrichment::new(aggregator, provenance, llm.clone())),
        ];

        Self::with_rules(
            rules,
            CatalogSearch::new(catalog, SearchLimits::from(config)),
            FallbackResponder::new(llm),
        )
    }

    pub fn with_rules(
        rules: Vec<Box<dyn Rule>>,
        search: CatalogSearch,
        fallback: FallbackResponder,
    ) -> Self {
        Self { rules, search, fallback, interactions: None }
    }

    /// Logs every answered recommendation. Logging failures never reach the customer.
    pub fn with_interactions(mut self, interactions: Arc<dyn InteractionRepository>) -> Self {
        self.interactions = Some(interactions);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub async fn run(&self, turn: &mut Turn<'_>) -> Result<String> {
        for rule in &self.rules {
            if !rule.matches(turn) {
                continue;
            }

            match rule.handle(turn).await? {
                RuleOutcome::Reply { text, finalize } => {
                    info!(event_name = "sommelier.rule.matched", rule = rule.name(), "rule answered");
                    return Ok(if finalize { humanize::finalize(turn.text, &text) } else { text });
                }
                RuleOutcome::Search(intent) => {
                    info!(event_name = "sommelier.rule.matched", rule = rule.name(), "rule requested search");
                    return self.answer_with_search(turn, &intent).await;
                }
                RuleOutcome::Continue => {
                    debug!(event_name = "sommelier.rule.declined", rule = rule.name(), "rule fell through");
                }
            }
        }

        let reply = self.fallback.respond(turn.text, CLARIFY_PREFERENCE).await;
        Ok(humanize::finalize(turn.text, &reply))
    }

    async fn answer_with_search(&self, turn: &mut Turn<'_>, intent: &Intent) -> Result<String> {
        let products = self.search.search(intent, &mut turn.state.rotation).await?;
        if products.is_empty() {
            let reply = self.fallback.respond(turn.text, NO_RESULTS).await;
            return Ok(humanize::finalize(turn.text, &reply));
        }

        turn.state.memory.register(intent.filters(), turn.now);
        let list = product_list(&products, turn.text);
        let reply = match intent.event_scale.map(event_line) {
            Some(line) => format!("{line}\n\n{list}"),
            None => list,
        };
        let reply = humanize::finalize(turn.text, &reply);
        self.record_interaction(turn, &reply).await;
        Ok(reply)
    }

    async fn record_interaction(&self, turn: &Turn<'_>, reply: &str) {
        let Some(interactions) = &self.interactions else {
            return;
        };
        let entry = NewInteraction {
            kind: InteractionKind::Recommendation,
            message: turn.text.to_string(),
            reply: reply.to_string(),
            created_at: turn.now,
        };
        if let Err(failure) = interactions.record(entry).await {
            warn!(
                event_name = "sommelier.interaction.record_failed",
                error = %failure,
                "could not log interaction"
            );
        }
    }
}

fn event_line(scale: EventScale) -> &'static str {
    match scale {
        EventScale::Large => "Para um evento grande, vale pensar em mais de uma opção 🎉",
        EventScale::Medium => "Para uma reunião entre amigos, essas opções funcionam bem 🙌",
        EventScale::Elegant => "Para uma ocasião mais elegante, esses rótulos fazem bonito ✨",
    }
}
