use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use sommelier_core::config::AssistantConfig;
use sommelier_core::errors::{ApplicationError, DomainError};
use sommelier_core::session::{SessionId, SessionState};
use sommelier_db::repositories::{
    CatalogRepository, InteractionRepository, RepositoryError, SessionRepository,
};

use crate::llm::GuardedLlm;
use crate::rules::{RuleChain, Turn};
use crate::speech::{SpeechToText, TextToSpeech, VoiceReply, UNINTELLIGIBLE_AUDIO};

pub const EMPTY_MESSAGE_REPLY: &str = "Ótimo dia! 🍷 Pode me dizer que tipo de bebida você procura?";

/// The assistant itself: one message in, one reply out, never an error.
pub struct Sommelier {
    chain: RuleChain,
    config: AssistantConfig,
}

impl Sommelier {
    pub fn new(catalog: Arc<dyn CatalogRepository>, llm: GuardedLlm, config: AssistantConfig) -> Self {
        Self { chain: RuleChain::new(catalog, llm, &config), config }
    }

    pub fn with_interactions(mut self, interactions: Arc<dyn InteractionRepository>) -> Self {
        self.chain = self.chain.with_interactions(interactions);
        self
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub async fn respond(&self, text: &str, state: &mut SessionState) -> String {
        self.respond_at(text, state, Utc::now()).await
    }

    /// Same as [`Sommelier::respond`] with an explicit clock.
    pub async fn respond_at(&self, text: &str, state: &mut SessionState, now: DateTime<Utc>) -> String {
        state.memory.set_policy(self.config.memory_policy());
        state.touch(now);

        let text = text.trim();
        if text.is_empty() {
            return EMPTY_MESSAGE_REPLY.to_string();
        }

        let correlation_id = Uuid::new_v4().to_string();
        let length = text.chars().count();
        if length > self.config.max_message_chars {
            let rejected = ApplicationError::from(DomainError::MessageTooLong {
                length,
                limit: self.config.max_message_chars,
            })
            .into_interface(correlation_id.as_str());
            warn!(event_name = "sommelier.message.rejected", correlation_id = %correlation_id, length, "message too long");
            return rejected.user_message().to_string();
        }

        let mut turn = Turn::new(text, state, now);
        match self.chain.run(&mut turn).await {
            Ok(reply) => reply,
            Err(failure) => {
                let interface = ApplicationError::Integration(failure.to_string())
                    .into_interface(correlation_id.as_str());
                error!(
                    event_name = "sommelier.respond.failed",
                    correlation_id = %correlation_id,
                    error = ?failure,
                    "message handling failed"
                );
                interface.user_message().to_string()
            }
        }
    }

    /// Transcribe, answer, and optionally synthesize. Each speech step degrades on its own.
    pub async fn respond_to_audio(
        &self,
        audio: &[u8],
        mime_type: &str,
        transcriber: &dyn SpeechToText,
        synthesizer: Option<&dyn TextToSpeech>,
        state: &mut SessionState,
    ) -> VoiceReply {
        let transcript = match transcriber.transcribe(audio, mime_type).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => UNINTELLIGIBLE_AUDIO.to_string(),
            Err(failure) => {
                warn!(event_name = "sommelier.speech.transcription_failed", error = %failure, "transcription failed");
                UNINTELLIGIBLE_AUDIO.to_string()
            }
        };

        let reply = self.respond(&transcript, state).await;
        let audio = match synthesizer {
            Some(synthesizer) => match synthesizer.synthesize(&reply).await {
                Ok(bytes) => Some(bytes),
                Err(failure) => {
                    warn!(event_name = "sommelier.speech.synthesis_failed", error = %failure, "synthesis failed");
                    None
                }
            },
            None => None,
        };

        VoiceReply { transcript, reply, audio }
    }
}

/// Persistent sessions around [`Sommelier`]: load, respond, save, one message
/// at a time per session.
pub struct SessionRuntime {
    assistant: Sommelier,
    sessions: Arc<dyn SessionRepository>,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionRuntime {
    pub fn new(assistant: Sommelier, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { assistant, sessions, locks: Mutex::new(HashMap::new()) }
    }

    pub fn assistant(&self) -> &Sommelier {
        &self.assistant
    }

    pub async fn handle(&self, session_id: &SessionId, text: &str) -> String {
        self.handle_at(session_id, text, Utc::now()).await
    }

    pub async fn handle_at(&self, session_id: &SessionId, text: &str, now: DateTime<Utc>) -> String {
        let lock = self.lock_for(session_id).await;
        let reply = {
            let _guard = lock.lock().await;
            self.handle_locked(session_id, text, now).await
        };
        drop(lock);
        self.release_idle_locks().await;
        reply
    }

    async fn handle_locked(&self, session_id: &SessionId, text: &str, now: DateTime<Utc>) -> String {
        let mut state = match self.sessions.load(session_id).await {
            Ok(state) => state.unwrap_or_default(),
            Err(failure) => {
                error!(
                    event_name = "sommelier.session.load_failed",
                    session_id = %session_id,
                    error = %failure,
                    "could not load session"
                );
                return ApplicationError::from(failure)
                    .into_interface(session_id.to_string())
                    .user_message()
                    .to_string();
            }
        };

        let reply = self.assistant.respond_at(text, &mut state, now).await;

        if let Err(failure) = self.sessions.save(session_id, &state, now).await {
            error!(
                event_name = "sommelier.session.save_failed",
                session_id = %session_id,
                error = %failure,
                "could not save session"
            );
        }
        reply
    }

    /// Drops sessions with no message in the last `max_idle`.
    pub async fn purge_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let removed = self.sessions.purge_idle(now - max_idle).await?;
        info!(event_name = "sommelier.session.purged", removed, "idle sessions purged");
        Ok(removed)
    }

    async fn lock_for(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(session_id.clone()).or_default().clone()
    }

    async fn release_idle_locks(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;
    use sommelier_core::config::AssistantConfig;
    use sommelier_core::domain::product::{NewProduct, Product, ProductId};
    use sommelier_core::session::{SessionId, SessionState};
    use sommelier_db::repositories::{
        CatalogQuery, CatalogRepository, InMemoryCatalogRepository, InMemorySessionRepository,
        PriceOrder, PriceStats, RepositoryError, SessionRepository,
    };

    use super::{SessionRuntime, Sommelier, EMPTY_MESSAGE_REPLY};
    use crate::llm::GuardedLlm;
    use crate::speech::{SpeechToText, TextToSpeech, UNINTELLIGIBLE_AUDIO};

    const APOLOGY: &str = "Tive um problema interno 😕 Pode tentar novamente?";

    struct OfflineCatalog;

    fn offline() -> RepositoryError {
        RepositoryError::NotFound("catalog offline".to_string())
    }

    #[async_trait]
    impl CatalogRepository for OfflineCatalog {
        async fn insert(&self, _product: NewProduct) -> Result<ProductId, RepositoryError> {
            Err(offline())
        }
        async fn find_by_id(&self, _id: ProductId) -> Result<Option<Product>, RepositoryError> {
            Err(offline())
        }
        async fn search(&self, _query: &CatalogQuery) -> Result<Vec<Product>, RepositoryError> {
            Err(offline())
        }
        async fn price_stats(&self, _category: &str) -> Result<Option<PriceStats>, RepositoryError> {
            Err(offline())
        }
        async fn price_extreme(
            &self,
            _category: Option<&str>,
            _order: PriceOrder,
        ) -> Result<Option<Product>, RepositoryError> {
            Err(offline())
        }
        async fn find_best_match(
            &self,
            _query: &str,
            _threshold: f64,
        ) -> Result<Option<Product>, RepositoryError> {
            Err(offline())
        }
        async fn distinct_categories(&self) -> Result<Vec<String>, RepositoryError> {
            Err(offline())
        }
        async fn distinct_brands(&self) -> Result<Vec<String>, RepositoryError> {
            Err(offline())
        }
        async fn update_origin(
            &self,
            _id: ProductId,
            _country: &str,
            _summary: Option<&str>,
        ) -> Result<(), RepositoryError> {
            Err(offline())
        }
        async fn count(&self) -> Result<i64, RepositoryError> {
            Err(offline())
        }
    }

    struct Transcript(Result<String, String>);

    #[async_trait]
    impl SpeechToText for Transcript {
        async fn transcribe(&self, _audio: &[u8], _mime_type: &str) -> Result<String> {
            self.0.clone().map_err(|message| anyhow!(message))
        }
    }

    struct EchoVoice;

    #[async_trait]
    impl TextToSpeech for EchoVoice {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    async fn wine_catalog() -> Arc<InMemoryCatalogRepository> {
        let catalog = Arc::new(InMemoryCatalogRepository::new());
        for (name, price) in [("Tinto da Casa", 25), ("Tinto Reserva", 50)] {
            catalog
                .insert(NewProduct {
                    display_name: name.to_string(),
                    category: "VINOS".to_string(),
                    brand: None,
                    price: Decimal::from(price),
                    stock_quantity: 5,
                    volume_ml: Some(750),
                    country_of_origin: None,
                    tasting_notes: None,
                })
                .await
                .expect("insert");
        }
        catalog
    }

    fn assistant(catalog: Arc<dyn CatalogRepository>) -> Sommelier {
        Sommelier::new(catalog, GuardedLlm::disabled(), AssistantConfig::default())
    }

    fn at(minute: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2025-03-01T20:{minute:02}:00Z"))
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn blank_messages_get_an_invitation() {
        let sommelier = assistant(wine_catalog().await);
        let mut state = SessionState::default();
        assert_eq!(sommelier.respond_at("   ", &mut state, at(0)).await, EMPTY_MESSAGE_REPLY);
        assert_eq!(state.last_message_at, Some(at(0)));
    }

    #[tokio::test]
    async fn oversized_messages_get_the_clarification_reply() {
        let sommelier = assistant(wine_catalog().await);
        let mut state = SessionState::default();
        let reply = sommelier.respond_at(&"vinho ".repeat(300), &mut state, at(0)).await;
        assert_eq!(
            reply,
            "Sua mensagem ficou um pouco confusa 😅 Pode me dizer de forma curta que bebida você procura?"
        );
    }

    #[tokio::test]
    async fn store_failures_become_an_apology() {
        let sommelier = assistant(Arc::new(OfflineCatalog));
        let mut state = SessionState::default();
        let reply = sommelier.respond_at("vinho até 30 dólares", &mut state, at(0)).await;
        assert_eq!(reply, APOLOGY);
    }

    #[tokio::test]
    async fn sessions_are_loaded_and_saved_around_each_message() {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let runtime = SessionRuntime::new(assistant(wine_catalog().await), sessions.clone());
        let id = SessionId("web-42".to_string());

        let first = runtime.handle_at(&id, "vinho até 30 dólares", at(0)).await;
        assert!(first.contains("Tinto Da Casa"), "{first}");

        let stored = sessions.load(&id).await.expect("load").expect("saved session");
        assert!(stored.memory.has_valid_context(at(1)));
        assert_eq!(stored.last_message_at, Some(at(0)));

        let follow_up = runtime.handle_at(&id, "e mais barato?", at(1)).await;
        assert!(follow_up.contains("Tinto Da Casa"), "{follow_up}");
        assert!(!follow_up.contains("Tinto Reserva"), "{follow_up}");
    }

    #[tokio::test]
    async fn idle_sessions_are_purged() {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let runtime = SessionRuntime::new(assistant(wine_catalog().await), sessions.clone());
        runtime.handle_at(&SessionId("old".to_string()), "oi", at(0)).await;
        runtime.handle_at(&SessionId("new".to_string()), "oi", at(50)).await;

        let removed = runtime.purge_idle(Duration::minutes(30), at(55)).await.expect("purge");
        assert_eq!(removed, 1);
        assert!(sessions.load(&SessionId("new".to_string())).await.expect("load").is_some());
    }

    #[tokio::test]
    async fn voice_turns_degrade_step_by_step() {
        let sommelier = assistant(wine_catalog().await);
        let mut state = SessionState::default();

        let heard = sommelier
            .respond_to_audio(b"...", "audio/webm", &Transcript(Ok(" oi ".to_string())), Some(&EchoVoice), &mut state)
            .await;
        assert_eq!(heard.transcript, "oi");
        assert_eq!(heard.audio.as_deref(), Some(heard.reply.as_bytes()));

        let garbled = sommelier
            .respond_to_audio(b"...", "audio/webm", &Transcript(Err("decoder".to_string())), None, &mut state)
            .await;
        assert_eq!(garbled.transcript, UNINTELLIGIBLE_AUDIO);
        assert!(garbled.audio.is_none());
        assert!(!garbled.reply.is_empty());
    }
}
