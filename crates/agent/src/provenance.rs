//! Country-of-origin answers for a product named in the message.
//!
//! The catalog is the first source. When it has no country, the text generator
//! is asked under a rigid `PAIS:` / `RESUMO:` grammar; only a well-formed,
//! plausible country is trusted and written back to the catalog. Unresolved
//! lookups are never cached.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use sommelier_core::domain::intent::DetectedProduct;
use sommelier_core::domain::product::is_valid_origin;
use sommelier_core::nlp::pattern::Pattern;
use sommelier_db::repositories::CatalogRepository;

use crate::llm::GuardedLlm;
use crate::reply::format_name;

pub const ASK_WHICH_PRODUCT: &str = "Para qual bebida você gostaria de saber a procedência? 🍷";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedOrigin {
    pub country: String,
    pub summary: Option<String>,
}

struct GrammarPatterns {
    country: Pattern,
    summary: Pattern,
}

fn grammar() -> &'static GrammarPatterns {
    static PATTERNS: OnceLock<GrammarPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| GrammarPatterns {
        country: Pattern::new(r"(?im)^\s*PAIS:\s*(.+)$"),
        summary: Pattern::new(r"(?im)^\s*RESUMO:\s*(.+)$"),
    })
}

/// Both lines are required; an unknown or implausible country is no answer.
pub fn parse_origin_reply(text: &str) -> Option<ResolvedOrigin> {
    let grammar = grammar();
    let country = grammar.country.captures(text)?.get(1)?.as_str().trim().to_string();
    let summary = grammar.summary.captures(text)?.get(1)?.as_str().trim().to_string();
    if !is_valid_origin(&country) {
        return None;
    }
    Some(ResolvedOrigin { country, summary: Some(summary).filter(|summary| !summary.is_empty()) })
}

fn origin_prompt(product_name: &str) -> String {
    format!(
        "Você é um especialista em vinhos e bebidas alcoólicas.\n\
         Informe a procedência REAL do produto abaixo.\n\n\
         Produto: \"{product_name}\"\n\n\
         Responda APENAS no formato abaixo (não escreva mais nada):\n\
         PAIS: <nome do país>\n\
         RESUMO: <resumo curto da procedência em uma frase>\n\n\
         REGRAS:\n\
         - Se não tiver certeza absoluta, responda exatamente:\n\
         PAIS: desconhecido\n\
         RESUMO: procedência não confirmada"
    )
}

#[derive(Clone)]
pub struct ProvenanceResolver {
    llm: GuardedLlm,
    catalog: Arc<dyn CatalogRepository>,
}

impl ProvenanceResolver {
    pub fn new(llm: GuardedLlm, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { llm, catalog }
    }

    pub async fn answer(&self, detected: Option<&DetectedProduct>) -> String {
        let Some(product) = detected else {
            return ASK_WHICH_PRODUCT.to_string();
        };
        let name = format_name(&product.name);

        if let Some(country) = product.origin.as_deref().filter(|origin| is_valid_origin(origin)) {
            return format!("{name} é de origem {} 🌍🍷", country.trim());
        }

        match self.resolve(product).await {
            Some(origin) => format!("{name} é de origem {} 🌍🍷", origin.country),
            None => format!("Ainda não consegui confirmar a procedência de {name} 😕"),
        }
    }

    /// Asks the generator and stores a trusted answer. Storage failures do not hide the answer.
    pub async fn resolve(&self, product: &DetectedProduct) -> Option<ResolvedOrigin> {
        let reply = self.llm.generate("provenance", &origin_prompt(&product.name)).await?;
        let Some(origin) = parse_origin_reply(&reply) else {
            warn!(
                event_name = "sommelier.provenance.unresolved",
                product_id = product.id.0,
                "origin reply was unusable"
            );
            return None;
        };

        match self
            .catalog
            .update_origin(product.id, &origin.country, origin.summary.as_deref())
            .await
        {
            Ok(()) => info!(
                event_name = "sommelier.provenance.stored",
                product_id = product.id.0,
                country = %origin.country,
                "origin stored"
            ),
            Err(error) => warn!(
                event_name = "sommelier.provenance.store_failed",
                product_id = product.id.0,
                error = %error,
                "could not store origin"
            ),
        }
        Some(origin)
    }
}
