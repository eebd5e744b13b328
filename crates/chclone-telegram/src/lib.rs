//! Telegram adapter (teloxide).
//!
//! This crate implements the `chclone-core` ChannelClient port over the Telegram Bot API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::StreamExt;
use teloxide::{
    net::Download,
    prelude::*,
    types::{InputFile, MessageEntity, Recipient},
    ApiError, RequestError,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[cfg(test)]
mod bot_api;
pub mod formatting;
pub mod ingest;

use chclone_core::{
    config::Config,
    domain::{ChannelRef, ChatId, ChatInfo, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::ChannelClient,
        throttled::{IntervalLimiter, ThrottledClient},
        types::{FormattedText, MediaKind, MediaPayload, MediaRef, SourceMessage},
    },
    Result,
};

use crate::ingest::ingest;

/// Adapter-only settings.
#[derive(Clone, Copy, Debug)]
pub struct TelegramSettings {
    /// Chat the bot forwards donor messages into while reading history.
    pub scratch_chat_id: ChatId,
    /// Newest donor message id; history probing starts here.
    pub donor_head_id: MessageId,
    /// Spacing between history probes.
    pub probe_interval: Duration,
}

impl TelegramSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            scratch_chat_id: cfg.scratch_chat_id,
            donor_head_id: cfg.donor_head_id,
            probe_interval: cfg.probe_interval,
        }
    }
}

/// Build the production client: Bot API adapter behind the throttling decorator.
pub fn connect(cfg: &Config) -> Arc<dyn ChannelClient> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());
    let raw: Arc<dyn ChannelClient> =
        Arc::new(TelegramClient::new(bot, TelegramSettings::from_config(cfg)));
    Arc::new(ThrottledClient::new(raw, cfg.throttle))
}

pub struct TelegramClient {
    bot: Bot,
    settings: TelegramSettings,
    probes: Mutex<IntervalLimiter>,
}

impl TelegramClient {
    pub fn new(bot: Bot, settings: TelegramSettings) -> Self {
        Self {
            bot,
            probes: Mutex::new(IntervalLimiter::new(settings.probe_interval)),
            settings,
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn recipient(channel: &ChannelRef) -> Recipient {
        match channel {
            ChannelRef::Id(id) => Recipient::Id(Self::tg_chat(*id)),
            ChannelRef::Username(name) => Recipient::ChannelUsername(name.clone()),
        }
    }

    fn sent_ref(msg: &Message) -> MessageRef {
        MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(e: RequestError) -> Error {
        match e {
            RequestError::RetryAfter(wait) => Error::RateLimited { wait },
            RequestError::Network(e) => Error::Transient(format!("telegram network error: {e}")),
            RequestError::Io(e) => Error::Transient(format!("telegram i/o error: {e}")),
            other => Error::External(format!("telegram error: {other}")),
        }
    }

    fn map_download_err(e: anyhow::Error) -> Error {
        match e.downcast::<RequestError>() {
            Ok(req) => Self::map_err(req),
            Err(other) => Error::Transient(format!("download interrupted: {other:#}")),
        }
    }

    /// The API's answers for an id that holds nothing we can read. Anything
    /// else (missing chat, lost rights, protected content) stops the fetch.
    fn is_missing_message(e: &ApiError) -> bool {
        match e {
            ApiError::MessageToForwardNotFound | ApiError::MessageIdInvalid => true,
            ApiError::Unknown(description) => {
                description == "Bad Request: message can't be forwarded"
            }
            _ => false,
        }
    }

    /// Read one donor message by forwarding it into the scratch chat.
    ///
    /// `Ok(None)` when there is no readable message at `id` (deleted, service
    /// message).
    async fn probe(&self, donor: ChatId, id: MessageId) -> Result<Option<SourceMessage>> {
        self.probes.lock().await.wait().await;

        let forwarded = self
            .bot
            .forward_message(
                Self::tg_chat(self.settings.scratch_chat_id),
                Self::tg_chat(donor),
                Self::tg_msg_id(id),
            )
            .await;

        let copy = match forwarded {
            Ok(copy) => copy,
            Err(RequestError::Api(e)) if Self::is_missing_message(&e) => {
                debug!("No readable message {id} in donor: {e}");
                return Ok(None);
            }
            Err(e) => return Err(Self::map_err(e)),
        };

        let msg = ingest(id, &copy);
        if let Err(e) = self.bot.delete_message(copy.chat.id, copy.id).await {
            warn!(
                "Failed to delete forwarded copy {} of donor message {id} from scratch chat {}: {e}",
                copy.id.0, self.settings.scratch_chat_id.0
            );
        }
        Ok(Some(msg))
    }

    async fn fetch_bytes(&self, kind: MediaKind, media: &MediaRef) -> anyhow::Result<Vec<u8>> {
        let file = self.bot.get_file(media.file_id.clone()).await?;
        let total = u64::from(file.meta.size);

        let mut bytes = Vec::with_capacity(total as usize);
        let mut stream = self.bot.download_file_stream(&file.path);
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
            let current = bytes.len() as u64;
            if total > 0 {
                debug!(
                    "Downloading {} {}: {:.2}% ({} of {} bytes)",
                    kind.label(),
                    media.file_id,
                    current as f64 * 100.0 / total as f64,
                    current,
                    total
                );
            }
        }
        Ok(bytes)
    }
}

fn bot_entities(text: &FormattedText) -> Option<Vec<MessageEntity>> {
    let entities = formatting::to_bot(&text.entities);
    (!entities.is_empty()).then_some(entities)
}

// Attach a caption, and its formatting, only when there is one.
macro_rules! with_caption {
    ($req:expr, $caption:expr) => {{
        let req = $req;
        match $caption {
            Some((text, Some(entities))) => req.caption(text).caption_entities(entities).await,
            Some((text, None)) => req.caption(text).await,
            None => req.await,
        }
    }};
}

#[async_trait]
impl ChannelClient for TelegramClient {
    async fn get_chat(&self, channel: &ChannelRef) -> Result<ChatInfo> {
        let chat = self
            .bot
            .get_chat(Self::recipient(channel))
            .await
            .map_err(Self::map_err)?;
        Ok(ChatInfo {
            id: ChatId(chat.id.0),
            title: chat.title().map(str::to_string),
        })
    }

    async fn history_page(
        &self,
        chat_id: ChatId,
        offset: MessageId,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        let limit = i32::try_from(limit.max(1)).unwrap_or(i32::MAX);
        let mut top = if offset.0 == 0 {
            self.settings.donor_head_id.0
        } else {
            offset.0 - 1
        };

        // Slide past windows that hold only gaps so an empty page means "done".
        let mut page = Vec::new();
        while top > 0 && page.is_empty() {
            let bottom = top.saturating_sub(limit - 1).max(1);
            for id in (bottom..=top).rev() {
                if let Some(msg) = self.probe(chat_id, MessageId(id)).await? {
                    page.push(msg);
                }
            }
            top = bottom - 1;
        }
        Ok(page)
    }

    async fn download(&self, kind: MediaKind, media: &MediaRef) -> Result<MediaPayload> {
        let bytes = self
            .fetch_bytes(kind, media)
            .await
            .map_err(Self::map_download_err)?;
        Ok(MediaPayload {
            bytes,
            file_name: media
                .file_name
                .clone()
                .unwrap_or_else(|| kind.default_file_name().to_string()),
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &FormattedText) -> Result<MessageRef> {
        let req = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.text.clone());
        let msg = match bot_entities(text) {
            Some(entities) => req.entities(entities).await,
            None => req.await,
        }
        .map_err(Self::map_err)?;
        Ok(Self::sent_ref(&msg))
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        payload: MediaPayload,
        caption: Option<&FormattedText>,
    ) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let file = InputFile::memory(payload.bytes).file_name(payload.file_name);
        let caption = caption.map(|c| (c.text.clone(), bot_entities(c)));

        let sent = match kind {
            MediaKind::Video => with_caption!(self.bot.send_video(chat, file), caption),
            MediaKind::Photo => with_caption!(self.bot.send_photo(chat, file), caption),
            MediaKind::Audio => with_caption!(self.bot.send_audio(chat, file), caption),
            MediaKind::Document => with_caption!(self.bot.send_document(chat, file), caption),
            MediaKind::Voice => with_caption!(self.bot.send_voice(chat, file), caption),
            MediaKind::VideoNote => self.bot.send_video_note(chat, file).await,
        }
        .map_err(Self::map_err)?;

        Ok(Self::sent_ref(&sent))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.bot
            .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}
