//! Output interception - the step between the agent and the transport.
//!
//! Every outbound batch passes through an `OutputInterceptor` before it
//! reaches a delivery callback. `SpeechFanout` is the production
//! interceptor: it sanitizes text blocks, drops the ones that sanitize to
//! nothing, and follows each surviving text block with a synthesized audio
//! block when a speech tool is configured.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::companion::block::Block;
use crate::companion::context::{EmitFn, Metadata};
use crate::companion::sanitize::clean_text;
use crate::companion::speech::SpeechTool;

/// Middleware over a delivery callback. Processes one batch of blocks and
/// pushes the result through `deliver`.
#[async_trait]
pub trait OutputInterceptor: Send + Sync {
    async fn process(
        &self,
        batch: Vec<Block>,
        deliver: &dyn EmitFn,
        metadata: &Metadata,
    ) -> Result<(), String>;
}

/// Sanitizes text output and fans it out into speech audio.
///
/// Per block, in input order:
/// - text: sanitize; drop if empty, otherwise deliver the sanitized text and
///   then, if speech is configured, a public audio block derived from it;
/// - media: deliver unchanged.
pub struct SpeechFanout {
    speech: Option<Arc<dyn SpeechTool>>,
}

impl SpeechFanout {
    pub fn new(speech: Option<Arc<dyn SpeechTool>>) -> Self {
        Self { speech }
    }
}

#[async_trait]
impl OutputInterceptor for SpeechFanout {
    async fn process(
        &self,
        batch: Vec<Block>,
        deliver: &dyn EmitFn,
        metadata: &Metadata,
    ) -> Result<(), String> {
        for mut block in batch {
            if !block.is_text() {
                deliver.emit(std::slice::from_ref(&block), metadata).await?;
                continue;
            }

            let text = clean_text(block.text_content());
            if text.is_empty() {
                debug!("Dropping block that sanitized to empty text");
                continue;
            }

            block.set_text(text);
            deliver.emit(std::slice::from_ref(&block), metadata).await?;

            if let Some(ref speech) = self.speech {
                // Synthesis failure skips the audio, never the text
                match speech.run(&block).await {
                    Ok(mut audio) => {
                        audio.public = true;
                        deliver.emit(std::slice::from_ref(&audio), metadata).await?;
                    }
                    Err(e) => warn!("Speech synthesis failed, skipping audio: {e}"),
                }
            }
        }
        Ok(())
    }
}
