//! Property-based tests for read receipt bookkeeping

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use sustainafood_chat::client::messaging::read_receipts::{apply_read, unread_for};
use sustainafood_chat::shared::messaging::{ChatId, ChatMessage, MessageId, UserId, UserRef};

const ME: &str = "alice";
const PEER: &str = "bob";

/// (incoming, already read) flags per message
fn transcript(flags: &[(bool, bool)]) -> Vec<ChatMessage> {
    let me = UserRef::new(ME, "Alice Corp");
    let peer = UserRef::new(PEER, "Bob NGO");
    let chat_id = ChatId::for_pair(&me.id, &peer.id);
    flags
        .iter()
        .enumerate()
        .map(|(i, &(incoming, read))| {
            let (sender, receiver) = if incoming {
                (peer.clone(), me.clone())
            } else {
                (me.clone(), peer.clone())
            };
            let message = ChatMessage::new(
                MessageId::new(format!("m{}", i)),
                chat_id.clone(),
                sender,
                receiver,
                "hello",
                Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            );
            if read {
                message.already_read()
            } else {
                message
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn test_applying_unread_ids_clears_unread(
        flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..30)
    ) {
        let me = UserId::from(ME);
        let mut messages = transcript(&flags);
        let unread = unread_for(&messages, &me);

        let changed = apply_read(&mut messages, &unread);

        prop_assert_eq!(changed, unread.len());
        prop_assert!(unread_for(&messages, &me).is_empty());
    }

    #[test]
    fn test_apply_read_never_unmarks(
        flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..30),
        picks in prop::collection::vec(0usize..30, 0..10)
    ) {
        let mut messages = transcript(&flags);
        let before: Vec<bool> = messages.iter().map(|m| m.is_read()).collect();
        let ids: Vec<MessageId> = picks.iter().map(|i| MessageId::new(format!("m{}", i))).collect();

        apply_read(&mut messages, &ids);

        for (message, was_read) in messages.iter().zip(before) {
            prop_assert!(!was_read || message.is_read());
        }
    }

    #[test]
    fn test_own_messages_are_never_unread(
        flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..30)
    ) {
        let me = UserId::from(ME);
        let messages = transcript(&flags);
        for id in unread_for(&messages, &me) {
            let message = messages.iter().find(|m| m.id == id).unwrap();
            prop_assert!(!message.is_from(&me));
        }
    }
}
