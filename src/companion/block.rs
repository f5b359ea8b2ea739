//! Blocks - units of conversational output.
//!
//! One agent turn produces a batch of blocks. A block is either text or a
//! piece of media (image, audio, video) carried as raw bytes or a URL
//! reference. Blocks flow from the agent through the output interceptor to a
//! delivery callback.

/// Kind of media carried by a non-text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// Media payload: raw bytes or a reference the transport can fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaData {
    Bytes(Vec<u8>),
    Url(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text(String),
    Media { kind: MediaKind, data: MediaData },
}

/// A single unit of turn output.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub content: BlockContent,
    /// Whether the underlying content may be served publicly (set on
    /// synthesized audio before delivery).
    pub public: bool,
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: BlockContent::Text(text.into()), public: false }
    }

    pub fn audio_bytes(data: Vec<u8>) -> Self {
        Self {
            content: BlockContent::Media { kind: MediaKind::Audio, data: MediaData::Bytes(data) },
            public: false,
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            content: BlockContent::Media { kind: MediaKind::Image, data: MediaData::Url(url.into()) },
            public: false,
        }
    }

    pub fn video_url(url: impl Into<String>) -> Self {
        Self {
            content: BlockContent::Media { kind: MediaKind::Video, data: MediaData::Url(url.into()) },
            public: false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, BlockContent::Text(_))
    }

    /// Text payload; empty for media blocks (malformed text is treated as
    /// empty and dropped downstream).
    pub fn text_content(&self) -> &str {
        match &self.content {
            BlockContent::Text(t) => t,
            BlockContent::Media { .. } => "",
        }
    }

    /// Replace the text payload. No-op for media blocks.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if let BlockContent::Text(t) = &mut self.content {
            *t = text.into();
        }
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        match &self.content {
            BlockContent::Media { kind, .. } => Some(*kind),
            BlockContent::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_block() {
        let block = Block::text("hello");
        assert!(block.is_text());
        assert_eq!(block.text_content(), "hello");
        assert!(!block.public);
        assert!(block.media_kind().is_none());
    }

    #[test]
    fn test_media_block_has_empty_text() {
        let block = Block::audio_bytes(vec![1, 2, 3]);
        assert!(!block.is_text());
        assert_eq!(block.text_content(), "");
        assert_eq!(block.media_kind(), Some(MediaKind::Audio));
    }

    #[test]
    fn test_set_text_only_affects_text_blocks() {
        let mut text = Block::text("before");
        text.set_text("after");
        assert_eq!(text.text_content(), "after");

        let mut media = Block::image_url("https://example.com/a.png");
        media.set_text("ignored");
        assert_eq!(media.media_kind(), Some(MediaKind::Image));
    }
}
