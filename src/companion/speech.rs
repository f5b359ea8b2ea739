//! Speech synthesis using ElevenLabs.
//!
//! Turns sanitized reply text into an audio block for voice-enabled
//! companions. Requires an ElevenLabs API key.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::companion::block::Block;
use crate::config::VoiceConfig;

/// Default ElevenLabs voice ("Rachel") used when no voice id is configured.
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

const MODEL_ID: &str = "eleven_monolingual_v1";

#[derive(Debug)]
pub enum SpeechError {
    Http(String),
    Api(String),
    EmptyText,
}

impl std::fmt::Display for SpeechError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechError::Http(e) => write!(f, "HTTP error: {e}"),
            SpeechError::Api(e) => write!(f, "API error: {e}"),
            SpeechError::EmptyText => write!(f, "no text to synthesize"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Generates a spoken version of a text block.
#[async_trait]
pub trait SpeechTool: Send + Sync {
    async fn run(&self, block: &Block) -> Result<Block, SpeechError>;
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'static str,
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsSpeech {
    api_key: String,
    voice_id: String,
    http: reqwest::Client,
}

impl ElevenLabsSpeech {
    pub fn new(voice: &VoiceConfig) -> Self {
        Self {
            api_key: voice.api_key.clone(),
            voice_id: voice
                .voice_id
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechTool for ElevenLabsSpeech {
    async fn run(&self, block: &Block) -> Result<Block, SpeechError> {
        let text = block.text_content();
        if text.is_empty() {
            return Err(SpeechError::EmptyText);
        }

        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let response = self
            .http
            .post(format!(
                "https://api.elevenlabs.io/v1/text-to-speech/{}",
                self.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&TtsRequest { text, model_id: MODEL_ID })
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api(format!("{status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;

        debug!("Generated {} bytes of MP3 audio", audio.len());
        Ok(Block::audio_bytes(audio.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voice_when_none_configured() {
        let speech = ElevenLabsSpeech::new(&VoiceConfig {
            api_key: "key".to_string(),
            voice_id: None,
        });
        assert_eq!(speech.voice_id, DEFAULT_VOICE_ID);
    }

    #[test]
    fn test_configured_voice_id_wins() {
        let speech = ElevenLabsSpeech::new(&VoiceConfig {
            api_key: "key".to_string(),
            voice_id: Some("custom-voice".to_string()),
        });
        assert_eq!(speech.voice_id, "custom-voice");
    }
}
