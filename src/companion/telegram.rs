//! Telegram delivery using teloxide.
//!
//! Implements the delivery callback over the Bot API: text blocks become
//! messages, audio bytes become audio uploads, URL media is passed by
//! reference for Telegram to fetch.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{info, warn};

use crate::companion::block::{Block, BlockContent, MediaData, MediaKind};
use crate::companion::context::{EmitFn, Metadata};

/// Delivery callback bound to one chat.
pub struct TelegramDelivery {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramDelivery {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    async fn send_block(&self, block: &Block) -> Result<(), String> {
        match &block.content {
            BlockContent::Text(text) => {
                self.bot
                    .send_message(self.chat_id, text)
                    .await
                    .map_err(|e| {
                        let msg = format!("Failed to send message: {e}");
                        warn!("{}", msg);
                        msg
                    })?;
            }
            BlockContent::Media { kind, data } => {
                let input = match data {
                    MediaData::Bytes(bytes) => {
                        info!("Sending {:?} to chat {} ({} bytes)", kind, self.chat_id, bytes.len());
                        InputFile::memory(bytes.clone()).file_name(match kind {
                            MediaKind::Audio => "speech.mp3",
                            MediaKind::Image => "image.png",
                            MediaKind::Video => "video.mp4",
                        })
                    }
                    MediaData::Url(url) => {
                        info!("Sending {:?} to chat {} ({})", kind, self.chat_id, url);
                        let url = reqwest::Url::parse(url)
                            .map_err(|e| format!("Invalid media url '{url}': {e}"))?;
                        InputFile::url(url)
                    }
                };

                let result = match kind {
                    MediaKind::Audio => self.bot.send_audio(self.chat_id, input).await,
                    MediaKind::Image => self.bot.send_photo(self.chat_id, input).await,
                    MediaKind::Video => self.bot.send_video(self.chat_id, input).await,
                };
                result.map_err(|e| {
                    let msg = format!("Failed to send {:?}: {e}", kind);
                    warn!("{}", msg);
                    msg
                })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EmitFn for TelegramDelivery {
    async fn emit(&self, blocks: &[Block], _metadata: &Metadata) -> Result<(), String> {
        for block in blocks {
            self.send_block(block).await?;
        }
        Ok(())
    }
}
