//! Companion service - the composition root for one agent turn.
//!
//! Owns the configuration, the agent, and the output interceptor. Each turn
//! runs the free-tier quota gate first; past the gate, the agent's batch is
//! pushed through `SpeechFanout` for every delivery callback the transport
//! registered.

use std::sync::Arc;

use tracing::info;

use crate::companion::agent::Agent;
use crate::companion::block::Block;
use crate::companion::context::ConversationContext;
use crate::companion::interceptor::{OutputInterceptor, SpeechFanout};
use crate::companion::speech::{ElevenLabsSpeech, SpeechTool};
use crate::config::CompanionConfig;

/// The three notices sent, in order, when a free-tier conversation runs out
/// of turns.
pub fn quota_notices(name: &str) -> Vec<Block> {
    vec![
        Block::text(format!("Thanks for trying out {name}!")),
        Block::text("Please deploy your own companion to keep chatting."),
        Block::text("The project README walks through self-hosting in a few minutes."),
    ]
}

pub struct CompanionService {
    config: CompanionConfig,
    agent: Arc<dyn Agent>,
    interceptor: SpeechFanout,
}

impl CompanionService {
    /// Build the service from configuration. Speech is enabled iff voice
    /// credentials are present.
    pub fn new(config: CompanionConfig, agent: Arc<dyn Agent>) -> Self {
        let speech: Option<Arc<dyn SpeechTool>> = config
            .voice
            .as_ref()
            .map(|voice| Arc::new(ElevenLabsSpeech::new(voice)) as Arc<dyn SpeechTool>);
        Self::with_speech(config, agent, speech)
    }

    /// Construction seam used by tests to substitute the speech tool.
    pub fn with_speech(
        config: CompanionConfig,
        agent: Arc<dyn Agent>,
        speech: Option<Arc<dyn SpeechTool>>,
    ) -> Self {
        Self { config, agent, interceptor: SpeechFanout::new(speech) }
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }

    /// Free-tier gate. Only whitelisted deployments are capped; when the cap
    /// is hit the fixed notices go out through every callback and the agent
    /// is never invoked.
    ///
    /// The comparison is on raw message count against twice the turn limit,
    /// so a half-finished exchange (the just-arrived user message) already
    /// counts toward the cap.
    async fn limit_exceeded(&self, ctx: &ConversationContext) -> Result<bool, String> {
        if !self.config.whitelist_configured() {
            return Ok(false);
        }
        if ctx.history.len() <= 2 * self.config.free_message_limit {
            return Ok(false);
        }

        info!(
            "Free-tier limit reached for chat {} ({} messages on record, limit {} turns)",
            ctx.chat_id,
            ctx.history.len(),
            self.config.free_message_limit
        );
        let notices = quota_notices(&self.config.name);
        for func in &ctx.emit_funcs {
            func.emit(&notices, &ctx.metadata).await?;
        }
        Ok(true)
    }

    /// Run one agent turn: quota gate, agent call, then interception and
    /// delivery through every registered callback. Returns the agent's raw
    /// batch so the caller can record the reply in its history.
    pub async fn run_turn(&self, ctx: &ConversationContext) -> Result<Vec<Block>, String> {
        if self.limit_exceeded(ctx).await? {
            return Ok(Vec::new());
        }

        let batch = self
            .agent
            .respond(ctx)
            .await
            .map_err(|e| format!("agent error: {e}"))?;

        for func in &ctx.emit_funcs {
            self.interceptor
                .process(batch.clone(), func.as_ref(), &ctx.metadata)
                .await?;
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_notices_shape() {
        let notices = quota_notices("Luna");
        assert_eq!(notices.len(), 3);
        assert!(notices.iter().all(|b| b.is_text()));
        assert_eq!(notices[0].text_content(), "Thanks for trying out Luna!");
    }
}
