//! Dialogue orchestration for the beverage assistant.
//!
//! A message flows through [`rules::RuleChain`]: greeting, price questions,
//! guards, conceptual questions and finally the enrichment pass, which builds
//! an [`sommelier_core::domain::intent::Intent`] with [`conversation::IntentAggregator`]
//! and hands it to [`search::CatalogSearch`]. Replies are worded by [`reply`]
//! and framed by [`humanize`].
//!
//! Text generation is optional. Every rule that uses it has a canned answer
//! for when the provider is disabled, slow, or evasive.

pub mod conversation;
pub mod guardrails;
pub mod humanize;
pub mod llm;
pub mod provenance;
pub mod reply;
pub mod rules;
pub mod runtime;
pub mod search;
pub mod speech;

pub use runtime::{SessionRuntime, Sommelier};
