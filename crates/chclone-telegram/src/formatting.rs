//! Bot API message entities ↔ core formatting spans.

use teloxide::types::{MessageEntity, MessageEntityKind};
use tracing::debug;

use chclone_core::messaging::types::{EntityKind, FormattedText, TextEntity};

/// Keep the spans that have to be re-sent explicitly. Auto-detected kinds
/// (urls, mentions, hashtags, commands) come back on their own.
pub fn from_bot(entities: &[MessageEntity]) -> Vec<TextEntity> {
    entities
        .iter()
        .filter_map(|e| {
            let kind = match &e.kind {
                MessageEntityKind::Bold => EntityKind::Bold,
                MessageEntityKind::Italic => EntityKind::Italic,
                MessageEntityKind::Underline => EntityKind::Underline,
                MessageEntityKind::Strikethrough => EntityKind::Strikethrough,
                MessageEntityKind::Spoiler => EntityKind::Spoiler,
                MessageEntityKind::Code => EntityKind::Code,
                MessageEntityKind::Pre { language } => EntityKind::Pre {
                    language: language.clone(),
                },
                MessageEntityKind::TextLink { url } => EntityKind::TextLink {
                    url: url.to_string(),
                },
                MessageEntityKind::CustomEmoji { custom_emoji_id } => EntityKind::CustomEmoji {
                    id: custom_emoji_id.clone(),
                },
                _ => return None,
            };
            Some(TextEntity::new(kind, e.offset, e.length))
        })
        .collect()
}

pub fn to_bot(entities: &[TextEntity]) -> Vec<MessageEntity> {
    entities
        .iter()
        .filter_map(|e| {
            let kind = match &e.kind {
                EntityKind::Bold => MessageEntityKind::Bold,
                EntityKind::Italic => MessageEntityKind::Italic,
                EntityKind::Underline => MessageEntityKind::Underline,
                EntityKind::Strikethrough => MessageEntityKind::Strikethrough,
                EntityKind::Spoiler => MessageEntityKind::Spoiler,
                EntityKind::Code => MessageEntityKind::Code,
                EntityKind::Pre { language } => MessageEntityKind::Pre {
                    language: language.clone(),
                },
                EntityKind::TextLink { url } => match reqwest::Url::parse(url) {
                    Ok(url) => MessageEntityKind::TextLink { url },
                    Err(err) => {
                        debug!("Dropping text link with bad url {url:?}: {err}");
                        return None;
                    }
                },
                EntityKind::CustomEmoji { id } => MessageEntityKind::CustomEmoji {
                    custom_emoji_id: id.clone(),
                },
            };
            Some(MessageEntity::new(kind, e.offset, e.length))
        })
        .collect()
}

/// Text or caption of a message, with its formatting.
pub fn body_of(msg: &teloxide::types::Message) -> FormattedText {
    if let Some(text) = msg.text() {
        FormattedText::new(text, from_bot(msg.entities().unwrap_or_default()))
    } else if let Some(caption) = msg.caption() {
        FormattedText::new(caption, from_bot(msg.caption_entities().unwrap_or_default()))
    } else {
        FormattedText::default()
    }
}
