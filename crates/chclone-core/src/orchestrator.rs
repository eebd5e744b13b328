use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    config::RunConfig,
    dispatch::{Copier, CopyOutcome},
    domain::{ChatId, ChatInfo, MessageId},
    history::{fetch_all, filter_and_order},
    messaging::{port::ChannelClient, types::FormattedText},
    pacing::Sleeper,
    retry::wait_out,
    Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Init,
    ValidateDonor,
    ValidateDestination,
    ProbeWrite,
    FetchHistory,
    FilterAndOrder,
    Iterate,
    Done,
}

/// What one run did. Only used for logging and tests; nothing is persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Set when the run stopped early in a validation state.
    pub aborted_in: Option<RunState>,
    pub fetched: usize,
    pub selected: usize,
    pub copied: usize,
    pub skipped: usize,
    pub abandoned: usize,
    pub last_copied: Option<MessageId>,
    /// Top-level restarts taken before this report was produced.
    pub restarts: u32,
}

/// Drives one donor → destination copy.
pub struct Orchestrator {
    cfg: RunConfig,
    client: Arc<dyn ChannelClient>,
    sleeper: Arc<dyn Sleeper>,
}

impl Orchestrator {
    pub fn new(cfg: RunConfig, client: Arc<dyn ChannelClient>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            cfg,
            client,
            sleeper,
        }
    }

    /// Run, restarting from scratch after a rate-limit signal escapes `run`.
    ///
    /// A restart re-fetches the whole history and re-applies the start filter.
    pub async fn run_with_restart(&self) -> Result<RunReport> {
        let mut restarts = 0;
        loop {
            match self.run().await {
                Ok(mut report) => {
                    report.restarts = restarts;
                    return Ok(report);
                }
                Err(Error::RateLimited { wait }) if restarts < self.cfg.max_restarts => {
                    restarts += 1;
                    warn!(
                        "Too many requests at top level. Waiting {} seconds and restarting ({restarts}/{})...",
                        wait.as_secs(),
                        self.cfg.max_restarts
                    );
                    self.sleeper.sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One pass over the donor history.
    ///
    /// Lookup and write-probe failures end the run with `aborted_in` set.
    /// History fetch errors, and a rate limit hit again on the probe retry,
    /// are returned to the caller.
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        self.enter(RunState::Init);
        match self.cfg.start_message_id {
            Some(start) => info!(
                "Copying from chat {} to chat {}, starting from ID {}",
                self.cfg.donor, self.cfg.destination, start
            ),
            None => info!(
                "Copying from chat {} to chat {}",
                self.cfg.donor, self.cfg.destination
            ),
        }

        self.enter(RunState::ValidateDonor);
        let donor = match self.client.get_chat(&self.cfg.donor).await {
            Ok(chat) => {
                info!("Donor chat: {} (ID: {})", title(&chat), chat.id.0);
                chat
            }
            Err(e) => {
                error!("Error with donor channel '{}': {e}", self.cfg.donor);
                return Ok(self.abort(report, RunState::ValidateDonor));
            }
        };

        self.enter(RunState::ValidateDestination);
        let destination = match self.client.get_chat(&self.cfg.destination).await {
            Ok(chat) => {
                info!("My chat: {} (ID: {})", title(&chat), chat.id.0);
                chat
            }
            Err(e) => {
                error!(
                    "Error with destination channel '{}': {e}",
                    self.cfg.destination
                );
                return Ok(self.abort(report, RunState::ValidateDestination));
            }
        };

        self.enter(RunState::ProbeWrite);
        if !self.probe_write(destination.id).await? {
            return Ok(self.abort(report, RunState::ProbeWrite));
        }

        self.enter(RunState::FetchHistory);
        let history = fetch_all(self.client.as_ref(), donor.id, self.cfg.page_size).await?;
        report.fetched = history.len();
        info!("Found {} messages in total", report.fetched);

        self.enter(RunState::FilterAndOrder);
        let selected = filter_and_order(history, self.cfg.start_message_id);
        report.selected = selected.len();
        if let Some(start) = self.cfg.start_message_id {
            info!(
                "After filtering, {} messages remain, starting from ID {}",
                report.selected,
                start.0 + 1
            );
        }

        self.enter(RunState::Iterate);
        let copier = Copier::new(
            self.client.as_ref(),
            self.sleeper.as_ref(),
            destination.id,
            &self.cfg,
        );
        for msg in &selected {
            match copier.copy(msg).await {
                Ok(CopyOutcome::Copied) => {
                    report.copied += 1;
                    report.last_copied = Some(msg.id);
                }
                Ok(CopyOutcome::Skipped) => report.skipped += 1,
                Ok(CopyOutcome::Abandoned) => report.abandoned += 1,
                Err(Error::RateLimited { wait }) => {
                    // The message is dropped, not retried, once the wait is over.
                    wait_out(
                        self.sleeper.as_ref(),
                        wait,
                        &format!("while copying message ID {}", msg.id),
                    )
                    .await;
                    report.abandoned += 1;
                }
                Err(e) => {
                    error!("Error copying message ID {}: {e}", msg.id);
                    report.abandoned += 1;
                }
            }
        }

        self.enter(RunState::Done);
        info!(
            "Done: {} copied, {} skipped, {} abandoned of {} selected (last copied ID: {})",
            report.copied,
            report.skipped,
            report.abandoned,
            report.selected,
            report
                .last_copied
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(report)
    }

    /// Send and delete a test message. `Ok(false)` means "abort the run".
    async fn probe_write(&self, chat_id: ChatId) -> Result<bool> {
        match self.send_probe(chat_id).await {
            Ok(()) => Ok(true),
            Err(Error::RateLimited { wait }) => {
                wait_out(self.sleeper.as_ref(), wait, "during test message").await;
                self.send_probe(chat_id).await?;
                Ok(true)
            }
            Err(e) => {
                error!("Failed to send test message to {}: {e}", chat_id.0);
                Ok(false)
            }
        }
    }

    async fn send_probe(&self, chat_id: ChatId) -> Result<()> {
        let text = FormattedText::plain(self.cfg.probe_text.as_str());
        let msg = self.client.send_text(chat_id, &text).await?;
        info!("Test message sent to {}: {}", chat_id.0, msg.message_id);
        self.client.delete_message(msg).await
    }

    fn enter(&self, state: RunState) {
        info!("state -> {state:?}");
    }

    fn abort(&self, mut report: RunReport, state: RunState) -> RunReport {
        report.aborted_in = Some(state);
        self.enter(RunState::Done);
        report
    }
}

fn title(chat: &ChatInfo) -> &str {
    chat.title.as_deref().unwrap_or("<untitled>")
}
