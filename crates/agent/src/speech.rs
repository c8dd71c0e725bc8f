//! Voice channel seams. Transcription and synthesis are provided by the host;
//! the assistant only composes them around a text turn.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Fed to the assistant when transcription fails or comes back empty.
pub const UNINTELLIGIBLE_AUDIO: &str = "Não consegui entender o áudio.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoiceReply {
    /// What the assistant understood the customer said.
    pub transcript: String,
    pub reply: String,
    /// Absent when no synthesizer is configured or synthesis failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<u8>>,
}
