//! In-crate fakes for exercising the pipeline without a platform.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicI32, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChannelRef, ChatId, ChatInfo, MessageId, MessageRef},
    messaging::{
        port::ChannelClient,
        types::{FormattedText, MediaKind, MediaPayload, MediaRef, SourceMessage, TextEntity},
    },
    pacing::Sleeper,
    Error, Result,
};

/// Scripted call result, turned into a fresh `Error` when played back.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Let this call through.
    Pass,
    RateLimited(u64),
    Transient,
    Other,
}

impl Fault {
    fn into_result(self) -> Result<()> {
        match self {
            Fault::Pass => Ok(()),
            Fault::RateLimited(secs) => Err(Error::RateLimited {
                wait: Duration::from_secs(secs),
            }),
            Fault::Transient => Err(Error::Transient("bad msg_seqno".to_string())),
            Fault::Other => Err(Error::External("boom".to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text(ChatId, String),
    Media(ChatId, MediaKind, Option<String>),
}

#[derive(Default)]
pub struct FakeClient {
    /// Donor history, in any order.
    pub history: Vec<SourceMessage>,
    pub missing_chats: Vec<ChannelRef>,

    pub history_faults: Mutex<VecDeque<Fault>>,
    pub media_faults: Mutex<VecDeque<Fault>>,
    pub text_faults: Mutex<VecDeque<Fault>>,

    next_id: AtomicI32,
    pub history_calls: Mutex<Vec<MessageId>>,
    pub media_attempts: AtomicUsize,
    pub downloads: AtomicUsize,
    pub sent: Mutex<Vec<Sent>>,
    /// Formatting of every sent text or caption, in send order.
    pub formatting: Mutex<Vec<Vec<TextEntity>>>,
    pub deleted: Mutex<Vec<MessageRef>>,
}

impl FakeClient {
    /// Donor channel holding text messages `1..=n`.
    pub fn with_history(n: i32) -> Self {
        Self::with_messages(
            (1..=n)
                .map(|i| SourceMessage::text(MessageId(i), format!("message {i}")))
                .collect(),
        )
    }

    pub fn with_messages(history: Vec<SourceMessage>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    pub fn fail_history(&self, faults: impl IntoIterator<Item = Fault>) {
        self.history_faults.lock().unwrap().extend(faults);
    }

    pub fn fail_media(&self, faults: impl IntoIterator<Item = Fault>) {
        self.media_faults.lock().unwrap().extend(faults);
    }

    pub fn fail_text(&self, faults: impl IntoIterator<Item = Fault>) {
        self.text_faults.lock().unwrap().extend(faults);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(_, t) => Some(t),
                Sent::Media(..) => None,
            })
            .collect()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    fn record_formatting(&self, text: Option<&FormattedText>) {
        if let Some(text) = text {
            self.formatting.lock().unwrap().push(text.entities.clone());
        }
    }

    fn take_fault(queue: &Mutex<VecDeque<Fault>>) -> Result<()> {
        let next = queue.lock().unwrap().pop_front();
        next.map_or(Ok(()), Fault::into_result)
    }
}

#[async_trait]
impl ChannelClient for FakeClient {
    async fn get_chat(&self, channel: &ChannelRef) -> Result<ChatInfo> {
        if self.missing_chats.contains(channel) {
            return Err(Error::External(format!("chat not found: {channel}")));
        }
        let id = match channel {
            ChannelRef::Id(id) => *id,
            ChannelRef::Username(_) => ChatId(-100),
        };
        Ok(ChatInfo {
            id,
            title: Some(format!("chat {channel}")),
        })
    }

    async fn history_page(
        &self,
        _chat_id: ChatId,
        offset: MessageId,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        self.history_calls.lock().unwrap().push(offset);
        Self::take_fault(&self.history_faults)?;

        let mut older: Vec<SourceMessage> = self
            .history
            .iter()
            .filter(|m| offset.0 == 0 || m.id < offset)
            .cloned()
            .collect();
        older.sort_by(|a, b| b.id.cmp(&a.id));
        older.truncate(limit);
        Ok(older)
    }

    async fn download(&self, kind: MediaKind, media: &MediaRef) -> Result<MediaPayload> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(MediaPayload {
            bytes: media.file_id.as_bytes().to_vec(),
            file_name: media
                .file_name
                .clone()
                .unwrap_or_else(|| kind.default_file_name().to_string()),
        })
    }

    async fn send_text(&self, chat_id: ChatId, text: &FormattedText) -> Result<MessageRef> {
        Self::take_fault(&self.text_faults)?;
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Text(chat_id, text.text.clone()));
        self.record_formatting(Some(text));
        Ok(self.alloc(chat_id))
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        _payload: MediaPayload,
        caption: Option<&FormattedText>,
    ) -> Result<MessageRef> {
        self.media_attempts.fetch_add(1, Ordering::SeqCst);
        Self::take_fault(&self.media_faults)?;
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Media(chat_id, kind, caption.map(|c| c.text.clone())));
        self.record_formatting(caption);
        Ok(self.alloc(chat_id))
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.deleted.lock().unwrap().push(msg);
        Ok(())
    }
}

/// Records requested suspensions and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
