//! Bot API message → `SourceMessage`.

use teloxide::types::Message;

use chclone_core::{
    domain::MessageId,
    messaging::types::{MediaKind, MediaRef, SourceMessage},
};

use crate::formatting::body_of;

/// Classify a Bot API message under the donor id it was probed with.
///
/// Forwarded copies carry their own id in the scratch chat; `id` is the
/// original donor message id.
pub fn ingest(id: MessageId, msg: &Message) -> SourceMessage {
    SourceMessage::classify(id, body_of(msg), |kind| media_of(msg, kind))
}

pub fn media_of(msg: &Message, kind: MediaKind) -> Option<MediaRef> {
    match kind {
        MediaKind::Video => msg
            .video()
            .map(|v| MediaRef::new(v.file.id.clone(), v.file_name.clone())),
        // Largest size comes last.
        MediaKind::Photo => msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|p| MediaRef::new(p.file.id.clone(), None)),
        MediaKind::Audio => msg
            .audio()
            .map(|a| MediaRef::new(a.file.id.clone(), a.file_name.clone())),
        MediaKind::Document => msg
            .document()
            .map(|d| MediaRef::new(d.file.id.clone(), d.file_name.clone())),
        MediaKind::Voice => msg.voice().map(|v| MediaRef::new(v.file.id.clone(), None)),
        MediaKind::VideoNote => msg
            .video_note()
            .map(|v| MediaRef::new(v.file.id.clone(), None)),
    }
}
