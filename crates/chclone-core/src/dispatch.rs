use tracing::info;

use crate::{
    captions::split_caption,
    config::RunConfig,
    domain::{ChatId, MessageId},
    messaging::{
        port::ChannelClient,
        types::{Content, FormattedText, MediaKind, MediaRef, SourceMessage},
    },
    pacing::Sleeper,
    retry::{retry_transient, Outcome},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Skipped,
    /// The main payload could not be delivered within the retry budget.
    Abandoned,
}

/// Retransmits single donor messages into the destination chat.
pub struct Copier<'a> {
    client: &'a dyn ChannelClient,
    sleeper: &'a dyn Sleeper,
    destination: ChatId,
    cfg: &'a RunConfig,
}

impl<'a> Copier<'a> {
    pub fn new(
        client: &'a dyn ChannelClient,
        sleeper: &'a dyn Sleeper,
        destination: ChatId,
        cfg: &'a RunConfig,
    ) -> Self {
        Self {
            client,
            sleeper,
            destination,
            cfg,
        }
    }

    /// Copy one message: main payload first, then the remaining caption chunks
    /// as standalone texts, each preceded by a pacing pause, then one more
    /// pause before the caller moves on. Skipped messages get that last pause
    /// too.
    ///
    /// Media failures are contained by the retry governor. Errors from the
    /// text sends (including rate limits) are returned to the caller.
    pub async fn copy(&self, msg: &SourceMessage) -> Result<CopyOutcome> {
        let parts = split_caption(&msg.body, self.cfg.caption_max_len);
        let mut follow_ups: &[FormattedText] = parts.get(1..).unwrap_or(&[]);

        let outcome = match (&msg.content, msg.content.media()) {
            (_, Some((kind, media))) => {
                let caption = if kind.accepts_caption() {
                    parts.first()
                } else {
                    // The whole caption goes out as follow-up texts.
                    follow_ups = &parts;
                    None
                };
                self.copy_media(msg.id, kind, media, caption).await
            }
            (Content::Text, None) => match parts.first() {
                Some(first) => {
                    self.client.send_text(self.destination, first).await?;
                    info!("Copied text ID {}", msg.id);
                    CopyOutcome::Copied
                }
                None => CopyOutcome::Skipped,
            },
            _ => CopyOutcome::Skipped,
        };

        if outcome == CopyOutcome::Skipped {
            info!("Skipped message ID {}: no content", msg.id);
        }

        for part in follow_ups {
            self.cfg.pacing.pause(self.sleeper).await;
            self.client.send_text(self.destination, part).await?;
            info!("Sent additional part for message ID {}", msg.id);
        }

        self.cfg.pacing.pause(self.sleeper).await;
        Ok(outcome)
    }

    async fn copy_media(
        &self,
        id: MessageId,
        kind: MediaKind,
        media: &MediaRef,
        caption: Option<&FormattedText>,
    ) -> CopyOutcome {
        let what = format!("{} ID {}", kind.label(), id);
        let client = self.client;
        let destination = self.destination;

        let sent = retry_transient(self.cfg.retry, self.sleeper, &what, move || async move {
            let payload = client.download(kind, media).await?;
            client.send_media(destination, kind, payload, caption).await
        })
        .await;

        match sent {
            Outcome::Done(_) => {
                info!("Copied {what}");
                CopyOutcome::Copied
            }
            Outcome::Abandoned => CopyOutcome::Abandoned,
        }
    }
}
