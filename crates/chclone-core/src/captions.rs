//! Caption splitting for Telegram's caption/message size limits.

use std::ops::Range;

use crate::messaging::types::{FormattedText, TextEntity};

/// Telegram's media caption limit, in characters.
pub const DEFAULT_CAPTION_LEN: usize = 1024;

/// Split `text` into chunks of at most `max_len` characters.
///
/// Each cut happens at the last whitespace inside the window. When the window
/// has none, the cut is made at exactly `max_len`. Whitespace around cuts is
/// dropped. Blank input yields no chunks. Each chunk keeps the parts of the
/// formatting spans that fall inside it, re-based to the chunk start.
pub fn split_caption(text: &FormattedText, max_len: usize) -> Vec<FormattedText> {
    let body = text.text.as_str();
    let spans: Vec<Range<usize>> = text
        .entities
        .iter()
        .map(|e| byte_at_utf16(body, e.offset)..byte_at_utf16(body, e.offset + e.length))
        .collect();

    chunk_ranges(body, max_len)
        .into_iter()
        .map(|chunk| {
            let entities = text
                .entities
                .iter()
                .zip(&spans)
                .filter_map(|(e, span)| {
                    let start = span.start.max(chunk.start);
                    let end = span.end.min(chunk.end);
                    (start < end).then(|| {
                        TextEntity::new(
                            e.kind.clone(),
                            utf16_len(&body[chunk.start..start]),
                            utf16_len(&body[start..end]),
                        )
                    })
                })
                .collect();
            FormattedText::new(&body[chunk], entities)
        })
        .collect()
}

/// Byte ranges of the chunks `split_caption` produces.
fn chunk_ranges(text: &str, max_len: usize) -> Vec<Range<usize>> {
    let max_len = max_len.max(1);
    let mut ranges = Vec::new();

    if text.trim().is_empty() {
        return ranges;
    }

    let mut span = 0..text.len();
    loop {
        let rest = &text[span.clone()];
        let Some((window_end, _)) = rest.char_indices().nth(max_len) else {
            // Fits in one chunk.
            if !rest.is_empty() {
                ranges.push(span);
            }
            break;
        };

        let window = &rest[..window_end];
        let cut = window
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i)
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        ranges.push(span.start..span.start + cut);

        let tail = &rest[cut..];
        let start = span.start + cut + (tail.len() - tail.trim_start().len());
        span = start..start + tail.trim().len();
    }

    ranges
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Byte index of the first char starting at or after `units` UTF-16 units.
fn byte_at_utf16(text: &str, units: usize) -> usize {
    let mut seen = 0;
    for (i, c) in text.char_indices() {
        if seen >= units {
            return i;
        }
        seen += c.len_utf16();
    }
    text.len()
}
