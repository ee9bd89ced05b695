//! Read receipt bookkeeping
//!
//! The backend marks a whole conversation read in one request. Locally only
//! the messages that were unread when the request was issued get flipped, and
//! only after the backend confirmed it.

use crate::shared::messaging::{ChatMessage, MessageId, UserId};

/// Ids of messages addressed to `me` that are still unread
pub fn unread_for(messages: &[ChatMessage], me: &UserId) -> Vec<MessageId> {
    messages
        .iter()
        .filter(|m| m.is_unread_for(me))
        .map(|m| m.id.clone())
        .collect()
}

/// Flag the given messages as read; returns how many changed
pub fn apply_read(messages: &mut [ChatMessage], ids: &[MessageId]) -> usize {
    let mut changed = 0;
    for message in messages.iter_mut().filter(|m| ids.contains(&m.id)) {
        if !message.is_read() {
            message.mark_read();
            changed += 1;
        }
    }
    changed
}
