use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChannelRef, ChatId, ChatInfo, MessageId, MessageRef},
    messaging::{
        port::ChannelClient,
        types::{FormattedText, MediaKind, MediaPayload, MediaRef, SourceMessage},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* two platform calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between writes to the same chat (~1 msg/sec per chat).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Hands out evenly spaced execution slots.
#[derive(Debug)]
pub struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    pub fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    /// Reserve a slot and sleep until it arrives.
    pub async fn wait(&mut self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

/// ChannelClient decorator that spaces outbound calls.
///
/// Lowers the rate at which the platform raises rate-limit signals. It does not
/// replace the governor: `RateLimited` errors still pass through untouched.
pub struct ThrottledClient {
    inner: Arc<dyn ChannelClient>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledClient {
    pub fn new(inner: Arc<dyn ChannelClient>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id.0).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        self.global.lock().await.wait().await;
    }
}

#[async_trait]
impl ChannelClient for ThrottledClient {
    async fn get_chat(&self, channel: &ChannelRef) -> Result<ChatInfo> {
        self.throttle_global().await;
        self.inner.get_chat(channel).await
    }

    async fn history_page(
        &self,
        chat_id: ChatId,
        offset: MessageId,
        limit: usize,
    ) -> Result<Vec<SourceMessage>> {
        self.throttle_global().await;
        self.inner.history_page(chat_id, offset, limit).await
    }

    async fn download(&self, kind: MediaKind, media: &MediaRef) -> Result<MediaPayload> {
        self.throttle_global().await;
        self.inner.download(kind, media).await
    }

    async fn send_text(&self, chat_id: ChatId, text: &FormattedText) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        payload: MediaPayload,
        caption: Option<&FormattedText>,
    ) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_media(chat_id, kind, payload, caption).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_chat(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }
}
