use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use sommelier_core::config::{LlmConfig, LlmProvider};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Used when no provider is configured; every call fails and callers fall back to canned replies.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(anyhow!("text generation is disabled"))
    }
}

/// Single-prompt client for OpenAI-compatible chat completions or Ollama's generate endpoint.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base_url = match (&config.base_url, config.provider) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, LlmProvider::OpenAi) => OPENAI_BASE_URL.to_string(),
            (None, LlmProvider::Ollama) => OLLAMA_BASE_URL.to_string(),
            (None, LlmProvider::Disabled) => {
                return Err(anyhow!("the disabled provider has no HTTP endpoint"))
            }
        };
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            return Err(anyhow!("llm.api_key is required for the openai provider"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": &self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.2
            }));
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion error {status}: {body}"));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no content"))
    }

    async fn ollama_generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&serde_json::json!({
                "model": &self.model,
                "prompt": prompt,
                "stream": false
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("ollama error {status}: {body}"));
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi => self.chat_completion(prompt).await,
            LlmProvider::Ollama => self.ollama_generate(prompt).await,
            LlmProvider::Disabled => DisabledLlm.complete(prompt).await,
        }
    }
}

/// Wraps a client with a per-attempt timeout and a bounded retry.
///
/// Failures never propagate: `generate` yields `None` and the calling rule
/// answers with its canned text instead.
#[derive(Clone)]
pub struct GuardedLlm {
    inner: Arc<dyn LlmClient>,
    timeout: Duration,
    max_retries: u32,
}

impl GuardedLlm {
    pub fn new(inner: Arc<dyn LlmClient>, timeout: Duration, max_retries: u32) -> Self {
        Self { inner, timeout, max_retries: max_retries.min(1) }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledLlm), Duration::from_secs(1), 0)
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let inner: Arc<dyn LlmClient> = match config.provider {
            LlmProvider::Disabled => Arc::new(DisabledLlm),
            LlmProvider::OpenAi | LlmProvider::Ollama => Arc::new(HttpLlmClient::new(config)?),
        };
        Ok(Self::new(inner, Duration::from_secs(config.timeout_secs.max(1)), config.max_retries))
    }

    /// Trimmed, non-empty completion text, or `None` once the attempts are spent.
    pub async fn generate(&self, purpose: &'static str, prompt: &str) -> Option<String> {
        for attempt in 0..=self.max_retries {
            match tokio::time::timeout(self.timeout, self.inner.complete(prompt)).await {
                Ok(Ok(text)) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        debug!(event_name = "sommelier.llm.completed", purpose, attempt, "text generated");
                        return Some(text.to_string());
                    }
                    warn!(event_name = "sommelier.llm.empty", purpose, attempt, "empty completion");
                }
                Ok(Err(error)) => {
                    warn!(
                        event_name = "sommelier.llm.failed",
                        purpose,
                        attempt,
                        error = %error,
                        "text generation failed"
                    );
                }
                Err(_) => {
                    warn!(
                        event_name = "sommelier.llm.timeout",
                        purpose,
                        attempt,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "text generation timed out"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::LlmClient;

    /// Replays canned completions and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn replying(replies: Vec<Result<String>>) -> Self {
            Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().map(|prompts| prompts.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.replies
                .lock()
                .map_err(|_| anyhow!("script poisoned"))?
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }
}
