use std::{env, fs, path::Path, time::Duration};

use crate::{
    captions::DEFAULT_CAPTION_LEN,
    domain::{ChannelRef, ChatId, MessageId},
    errors::Error,
    messaging::throttled::ThrottleConfig,
    pacing::Pacing,
    retry::RetryPolicy,
    Result,
};

// Compiled-in run targets; each can be overridden from the environment.
pub const DEFAULT_DONOR_CHANNEL: &str = "-1001629147115";
pub const DEFAULT_DESTINATION_CHANNEL: &str = "-1002673775019";
pub const DEFAULT_START_MESSAGE_ID: i32 = 6529;

/// Typed process configuration.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,

    // Run targets
    pub donor: ChannelRef,
    pub destination: ChannelRef,
    pub start_message_id: Option<MessageId>,

    // Pipeline tuning
    pub history_page_size: usize,
    pub caption_max_len: usize,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    pub top_level_restarts: u32,
    pub probe_text: String,

    // Telegram adapter
    pub scratch_chat_id: ChatId,
    pub donor_head_id: MessageId,
    pub probe_interval: Duration,
    pub throttle: ThrottleConfig,
}

/// Immutable per-run settings handed to the orchestrator.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub donor: ChannelRef,
    pub destination: ChannelRef,
    /// Exclusive lower bound: only ids strictly greater are copied.
    pub start_message_id: Option<MessageId>,
    pub page_size: usize,
    pub caption_max_len: usize,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    pub max_restarts: u32,
    pub probe_text: String,
}

impl RunConfig {
    pub fn new(donor: ChannelRef, destination: ChannelRef, start: Option<MessageId>) -> Self {
        Self {
            donor,
            destination,
            start_message_id: start,
            page_size: 50,
            caption_max_len: DEFAULT_CAPTION_LEN,
            pacing: Pacing::default(),
            retry: RetryPolicy::default(),
            max_restarts: 1,
            probe_text: "Test message from bot".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let donor = channel_ref("DONOR_CHANNEL", DEFAULT_DONOR_CHANNEL)?;
        let destination = channel_ref("DESTINATION_CHANNEL", DEFAULT_DESTINATION_CHANNEL)?;

        // 0 or an empty value disables the cursor.
        let start_message_id = match env_str("START_MESSAGE_ID") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().parse::<i32>().map_err(|_| {
                Error::Config(format!("START_MESSAGE_ID is not a message id: {raw}"))
            })?),
            None => Some(DEFAULT_START_MESSAGE_ID),
        }
        .filter(|id| *id > 0)
        .map(MessageId);

        let history_page_size = env_usize("HISTORY_PAGE_SIZE").unwrap_or(50).max(1);
        let caption_max_len = env_usize("CAPTION_MAX_LEN")
            .unwrap_or(DEFAULT_CAPTION_LEN)
            .max(1);
        let pacing = Pacing::new(
            env_u64("PACING_MIN_SECS").unwrap_or(6),
            env_u64("PACING_MAX_SECS").unwrap_or(20),
        );
        let retry = RetryPolicy {
            attempts: env_u32("MEDIA_ATTEMPTS").unwrap_or(3).max(1),
            backoff: Duration::from_secs(env_u64("SEQNO_BACKOFF_SECS").unwrap_or(5)),
        };
        let top_level_restarts = env_u32("TOP_LEVEL_RESTARTS").unwrap_or(1);
        let probe_text = env_str("PROBE_TEXT")
            .and_then(non_empty)
            .unwrap_or_else(|| "Test message from bot".to_string());

        // The Bot API has no history call; the adapter needs a place to
        // forward probes into and the newest donor id to start from.
        let scratch_chat_id = env_str("SCRATCH_CHAT_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .map(ChatId)
            .ok_or_else(|| {
                Error::Config("SCRATCH_CHAT_ID environment variable is required".to_string())
            })?;
        let donor_head_id = env_str("DONOR_HEAD_ID")
            .and_then(|s| s.trim().parse::<i32>().ok())
            .filter(|id| *id > 0)
            .map(MessageId)
            .ok_or_else(|| {
                Error::Config("DONOR_HEAD_ID environment variable is required".to_string())
            })?;
        let probe_interval = Duration::from_millis(env_u64("PROBE_INTERVAL_MS").unwrap_or(1100));

        let defaults = ThrottleConfig::default();
        let throttle = ThrottleConfig {
            global_min_interval: env_u64("THROTTLE_GLOBAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.global_min_interval),
            per_chat_min_interval: env_u64("THROTTLE_PER_CHAT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_chat_min_interval),
        };

        Ok(Self {
            telegram_bot_token,
            donor,
            destination,
            start_message_id,
            history_page_size,
            caption_max_len,
            pacing,
            retry,
            top_level_restarts,
            probe_text,
            scratch_chat_id,
            donor_head_id,
            probe_interval,
            throttle,
        })
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            donor: self.donor.clone(),
            destination: self.destination.clone(),
            start_message_id: self.start_message_id,
            page_size: self.history_page_size,
            caption_max_len: self.caption_max_len,
            pacing: self.pacing,
            retry: self.retry,
            max_restarts: self.top_level_restarts,
            probe_text: self.probe_text.clone(),
        }
    }
}

fn channel_ref(key: &str, default: &str) -> Result<ChannelRef> {
    let raw = env_str(key).unwrap_or_else(|| default.to_string());
    ChannelRef::parse(&raw).ok_or_else(|| Error::Config(format!("{key} must not be empty")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        out.push((key.to_string(), val.to_string()));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
