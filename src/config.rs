//! Companion configuration.
//!
//! A companion is described by a small JSON file: transport credentials,
//! persona fields used to build the system prompt, and optional voice
//! synthesis credentials. Everything is validated once at load time.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::ChatId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON (includes missing required fields).
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Telegram bot token for the companion.
    bot_token: String,
    /// OpenAI API key used for the companion's replies.
    openai_api_key: String,
    /// Optional API key for ElevenLabs voice synthesis.
    #[serde(default)]
    elevenlabs_api_key: String,
    /// Optional ElevenLabs voice id (falls back to the service default voice).
    #[serde(default)]
    elevenlabs_voice_id: String,
    /// Comma separated list of whitelisted chat ids. Empty = open deployment,
    /// no whitelist and no free-tier cap.
    #[serde(default)]
    chat_ids: String,
    /// The name of the companion.
    name: String,
    /// The byline of the companion.
    byline: String,
    /// The identity of the companion (free text, "who you are").
    identity: String,
    /// The behavior of the companion (free text, "how you behave").
    behavior: String,
    /// If true, use GPT-4. GPT-3.5 if false.
    #[serde(default = "default_use_gpt4")]
    use_gpt4: bool,
    /// Sampling temperature for the LLM.
    #[serde(default = "default_temperature")]
    temperature: f32,
    /// Free-tier cap on conversation turns for whitelisted deployments.
    #[serde(default = "default_free_message_limit")]
    free_message_limit: usize,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_use_gpt4() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.7
}

fn default_free_message_limit() -> usize {
    5
}

/// ElevenLabs voice synthesis credentials.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub api_key: String,
    /// Voice id; `None` uses the ElevenLabs default voice.
    pub voice_id: Option<String>,
}

/// Validated companion configuration. Immutable after load.
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    pub bot_token: String,
    pub openai_api_key: String,
    /// Present only when an ElevenLabs API key is configured.
    pub voice: Option<VoiceConfig>,
    /// Whitelisted chat ids. Empty = no whitelist (self-hosted, uncapped).
    pub chat_ids: HashSet<ChatId>,
    pub name: String,
    pub byline: String,
    pub identity: String,
    pub behavior: String,
    pub use_gpt4: bool,
    pub temperature: f32,
    pub free_message_limit: usize,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
}

impl CompanionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        for (field, value) in [
            ("bot_token", &file.bot_token),
            ("openai_api_key", &file.openai_api_key),
            ("name", &file.name),
            ("byline", &file.byline),
            ("identity", &file.identity),
            ("behavior", &file.behavior),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{} is required", field)));
            }
        }

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        if !(0.0..=2.0).contains(&file.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                file.temperature
            )));
        }

        let chat_ids = parse_chat_ids(&file.chat_ids)?;

        let voice = if file.elevenlabs_api_key.is_empty() {
            None
        } else {
            let voice_id = if file.elevenlabs_voice_id.is_empty() {
                None
            } else {
                Some(file.elevenlabs_voice_id)
            };
            Some(VoiceConfig { api_key: file.elevenlabs_api_key, voice_id })
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            bot_token: file.bot_token,
            openai_api_key: file.openai_api_key,
            voice,
            chat_ids,
            name: file.name,
            byline: file.byline,
            identity: file.identity,
            behavior: file.behavior,
            use_gpt4: file.use_gpt4,
            temperature: file.temperature,
            free_message_limit: file.free_message_limit,
            data_dir,
        })
    }

    /// True when a chat whitelist is configured. The free-tier cap only
    /// applies to whitelisted deployments.
    pub fn whitelist_configured(&self) -> bool {
        !self.chat_ids.is_empty()
    }

    pub fn allows_chat(&self, chat_id: ChatId) -> bool {
        self.chat_ids.is_empty() || self.chat_ids.contains(&chat_id)
    }
}

fn parse_chat_ids(raw: &str) -> Result<HashSet<ChatId>, ConfigError> {
    let mut ids = HashSet::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let id: i64 = entry.parse().map_err(|_| {
            ConfigError::Validation(format!("chat_ids entry '{}' is not a valid chat id", entry))
        })?;
        ids.insert(ChatId(id));
    }
    Ok(ids)
}
