use tracing::info;

use crate::{
    domain::{ChatId, MessageId},
    messaging::{port::ChannelClient, types::SourceMessage},
    Result,
};

/// Pull the complete history of `chat_id`, page by page.
///
/// The result keeps the platform's order: newest first. Errors abort the whole
/// fetch; there is no retry at this layer.
pub async fn fetch_all(
    client: &dyn ChannelClient,
    chat_id: ChatId,
    page_size: usize,
) -> Result<Vec<SourceMessage>> {
    let mut all = Vec::new();
    let mut offset = MessageId(0);

    loop {
        let page = client.history_page(chat_id, offset, page_size).await?;
        let Some(oldest) = page.last() else {
            break;
        };

        offset = oldest.id;
        info!(
            "Retrieved {} messages, current offset_id: {}",
            page.len(),
            offset
        );
        all.extend(page);
    }

    Ok(all)
}

/// Oldest-first, keeping only ids strictly above `start`.
pub fn filter_and_order(
    mut history: Vec<SourceMessage>,
    start: Option<MessageId>,
) -> Vec<SourceMessage> {
    history.reverse();
    if let Some(start) = start {
        history.retain(|m| m.id > start);
    }
    history
}
