//! Destructive chat clearing.
//!
//! Deletes a chat's entire history in bounded batches. Irreversible; the
//! front-ends only call this after an explicit user confirmation. The whole
//! history is cleared, without an arbitrary cap.

use {
    telefwd_client::TelegramGateway,
    telefwd_common::Result,
    tracing::{debug, info, warn},
};

/// The provider accepts at most this many ids per deletion request.
pub const DELETE_BATCH: usize = 100;

/// Delete every message in `chat`. Returns the total number deleted.
pub async fn clear_chat(gateway: &dyn TelegramGateway, chat: i64) -> Result<u64> {
    let ids = gateway.message_ids(chat).await?;
    if ids.is_empty() {
        info!(chat, "no messages to delete");
        return Ok(0);
    }

    info!(chat, total = ids.len(), "clearing chat history");
    let mut deleted: u64 = 0;
    for batch in ids.chunks(DELETE_BATCH) {
        match gateway.delete_messages(chat, batch).await {
            Ok(count) => {
                deleted += count as u64;
                debug!(chat, batch = batch.len(), deleted, "deleted message batch");
            },
            Err(e) => {
                // The messages already removed are gone; record how far we got.
                warn!(chat, deleted, error = %e, "chat clearing stopped part-way");
                return Err(e);
            },
        }
    }
    Ok(deleted)
}
