//! Companion module - persona-configured agent turns with output interception.

pub mod agent;
pub mod block;
pub mod context;
pub mod interceptor;
pub mod sanitize;
pub mod service;
pub mod speech;
pub mod telegram;


pub use agent::{system_prompt, Agent, AgentError, OpenAiAgent};
pub use block::{Block, BlockContent, MediaData, MediaKind};
pub use context::{turns_used, ConversationContext, EmitFn, HistoryEntry, Metadata, Role};
pub use interceptor::{OutputInterceptor, SpeechFanout};
pub use sanitize::clean_text;
pub use service::{quota_notices, CompanionService};
pub use speech::{ElevenLabsSpeech, SpeechError, SpeechTool};
pub use telegram::TelegramDelivery;
