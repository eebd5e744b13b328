use async_trait::async_trait;

use crate::{
    domain::{ChannelRef, ChatId, ChatInfo, MessageId, MessageRef},
    messaging::types::{FormattedText, MediaKind, MediaPayload, MediaRef, SourceMessage},
    Result,
};

/// Hexagonal port for the messaging platform.
///
/// Implementations report throttling as `Error::RateLimited` and retryable
/// protocol hiccups as `Error::Transient`; the governor depends on that split.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    async fn get_chat(&self, channel: &ChannelRef) -> Result<ChatInfo>;

    /// Up to `limit` messages with id strictly below `offset`, newest first.
    /// `MessageId(0)` means "start from the newest message". An empty page
    /// means the history is exhausted.
    async fn history_page(
        &self,
        chat_id: ChatId,
        offset: MessageId,
        limit: usize,
    ) -> Result<Vec<SourceMessage>>;

    /// Download a media payload fully into memory.
    async fn download(&self, kind: MediaKind, media: &MediaRef) -> Result<MediaPayload>;

    async fn send_text(&self, chat_id: ChatId, text: &FormattedText) -> Result<MessageRef>;

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        payload: MediaPayload,
        caption: Option<&FormattedText>,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}
