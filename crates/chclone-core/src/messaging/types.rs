use crate::domain::MessageId;

/// Media payload kinds the cloner knows how to retransmit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Photo,
    Audio,
    Document,
    Voice,
    VideoNote,
}

impl MediaKind {
    /// Dispatch priority. A message is classified by the first kind it carries.
    pub const PRIORITY: [MediaKind; 6] = [
        MediaKind::Video,
        MediaKind::Photo,
        MediaKind::Audio,
        MediaKind::Document,
        MediaKind::Voice,
        MediaKind::VideoNote,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Photo => "photo",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
            MediaKind::Voice => "voice message",
            MediaKind::VideoNote => "video note",
        }
    }

    /// Video notes cannot carry a caption on Telegram.
    pub fn accepts_caption(self) -> bool {
        !matches!(self, MediaKind::VideoNote)
    }

    /// File name used for in-memory uploads when the source has none.
    pub fn default_file_name(self) -> &'static str {
        match self {
            MediaKind::Video => "video.mp4",
            MediaKind::Photo => "photo.jpg",
            MediaKind::Audio => "audio.mp3",
            MediaKind::Document => "document.bin",
            MediaKind::Voice => "voice.ogg",
            MediaKind::VideoNote => "video_note.mp4",
        }
    }
}

/// Platform handle for a downloadable media payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    pub file_id: String,
    pub file_name: Option<String>,
}

impl MediaRef {
    pub fn new(file_id: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name,
        }
    }
}

/// Media bytes held in memory between download and upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Formatting that survives the copy. Auto-detected spans (links, mentions,
/// hashtags) are left out; the platform re-detects them on send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre { language: Option<String> },
    TextLink { url: String },
    CustomEmoji { id: String },
}

/// A formatting span. Offsets are in UTF-16 code units, as Telegram counts them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl TextEntity {
    pub fn new(kind: EntityKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }
}

/// Text plus its formatting spans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormattedText {
    pub text: String,
    pub entities: Vec<TextEntity>,
}

impl FormattedText {
    pub fn new(text: impl Into<String>, entities: Vec<TextEntity>) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&str> for FormattedText {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

impl From<String> for FormattedText {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

/// What a source message carries, decided once at ingestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Text,
    Video(MediaRef),
    Photo(MediaRef),
    Audio(MediaRef),
    Document(MediaRef),
    Voice(MediaRef),
    VideoNote(MediaRef),
    Empty,
}

impl Content {
    pub fn from_media(kind: MediaKind, media: MediaRef) -> Self {
        match kind {
            MediaKind::Video => Content::Video(media),
            MediaKind::Photo => Content::Photo(media),
            MediaKind::Audio => Content::Audio(media),
            MediaKind::Document => Content::Document(media),
            MediaKind::Voice => Content::Voice(media),
            MediaKind::VideoNote => Content::VideoNote(media),
        }
    }

    pub fn media(&self) -> Option<(MediaKind, &MediaRef)> {
        match self {
            Content::Video(m) => Some((MediaKind::Video, m)),
            Content::Photo(m) => Some((MediaKind::Photo, m)),
            Content::Audio(m) => Some((MediaKind::Audio, m)),
            Content::Document(m) => Some((MediaKind::Document, m)),
            Content::Voice(m) => Some((MediaKind::Voice, m)),
            Content::VideoNote(m) => Some((MediaKind::VideoNote, m)),
            Content::Text | Content::Empty => None,
        }
    }
}

/// A donor-channel message as seen by the cloner. Read-only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: MessageId,
    /// Text of a text message, or the caption of a media message.
    pub body: FormattedText,
    pub content: Content,
}

impl SourceMessage {
    /// Classify a message, probing `media_of` in `MediaKind::PRIORITY` order.
    pub fn classify(
        id: MessageId,
        body: impl Into<FormattedText>,
        mut media_of: impl FnMut(MediaKind) -> Option<MediaRef>,
    ) -> Self {
        let body = body.into();
        let media = MediaKind::PRIORITY
            .iter()
            .find_map(|&kind| media_of(kind).map(|m| Content::from_media(kind, m)));

        let content = match media {
            Some(c) => c,
            None if !body.is_blank() => Content::Text,
            None => Content::Empty,
        };

        Self { id, body, content }
    }

    pub fn text(id: MessageId, body: impl Into<FormattedText>) -> Self {
        Self::classify(id, body, |_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_wins_over_other_media() {
        let msg = SourceMessage::classify(MessageId(1), "cap", |kind| match kind {
            MediaKind::Video | MediaKind::Document => Some(MediaRef::new(kind.label(), None)),
            _ => None,
        });
        assert_eq!(
            msg.content,
            Content::Video(MediaRef::new("video", None))
        );
    }

    #[test]
    fn priority_table_is_fixed() {
        assert_eq!(
            MediaKind::PRIORITY,
            [
                MediaKind::Video,
                MediaKind::Photo,
                MediaKind::Audio,
                MediaKind::Document,
                MediaKind::Voice,
                MediaKind::VideoNote,
            ]
        );
    }

    #[test]
    fn text_only_and_empty_messages() {
        assert_eq!(SourceMessage::text(MessageId(1), "hi").content, Content::Text);
        assert_eq!(SourceMessage::text(MessageId(2), "").content, Content::Empty);
        assert_eq!(SourceMessage::text(MessageId(3), "  \n").content, Content::Empty);
    }

    #[test]
    fn formatting_does_not_make_blank_text_copyable() {
        let body = FormattedText::new("  ", vec![TextEntity::new(EntityKind::Bold, 0, 2)]);
        let msg = SourceMessage::text(MessageId(4), body);
        assert_eq!(msg.content, Content::Empty);
    }

    #[test]
    fn only_video_notes_refuse_captions() {
        for kind in MediaKind::PRIORITY {
            assert_eq!(kind.accepts_caption(), kind != MediaKind::VideoNote);
        }
    }
}
