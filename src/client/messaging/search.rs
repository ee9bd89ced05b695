//! Conversation list filtering

use crate::shared::messaging::{Conversation, UserId};

/// Conversations whose other participant's name contains `query`,
/// ignoring case. A blank query keeps every conversation.
pub fn filter_conversations(
    conversations: &[Conversation],
    current_user: &UserId,
    query: &str,
) -> Vec<Conversation> {
    let query = query.trim().to_lowercase();

    if query.is_empty() {
        return conversations.to_vec();
    }

    conversations
        .iter()
        .filter(|conv| {
            conv.other_participant(current_user)
                .map(|p| p.name.to_lowercase().contains(query.as_str()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Sum of unread counts, shown as the badge of the messaging entry point
pub fn total_unread(conversations: &[Conversation]) -> u32 {
    conversations.iter().map(|c| c.unread_count).sum()
}
