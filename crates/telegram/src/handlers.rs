//! Normalization of Bot API updates into [`InboundEvent`]s.
//!
//! The identity of every event is the private chat id. Group, channel and
//! service messages are dropped here so the relay only ever sees one-to-one
//! conversations.

use {
    relaydesk_channels::InboundEvent,
    relaydesk_common::{MessageRef, Participant},
    teloxide::types::{CallbackQuery, MediaKind, Message, MessageKind, Update, UpdateKind, User},
    tracing::debug,
};

/// Convert an update, or `None` if the relay has no use for it.
pub fn to_inbound(update: Update) -> Option<InboundEvent> {
    match update.kind {
        UpdateKind::Message(msg) => message_event(msg),
        UpdateKind::CallbackQuery(query) => callback_event(query),
        other => {
            debug!("ignoring non-message update: {other:?}");
            None
        },
    }
}

fn message_event(msg: Message) -> Option<InboundEvent> {
    if !msg.chat.is_private() {
        debug!(chat_id = msg.chat.id.0, "ignoring message outside a private chat");
        return None;
    }
    let MessageKind::Common(common) = &msg.kind else {
        debug!(chat_id = msg.chat.id.0, "ignoring service message");
        return None;
    };

    // Only plain text travels as text; media (captioned or not) is copied.
    let text = match &common.media_kind {
        MediaKind::Text(t) => Some(t.text.clone()),
        _ => None,
    };

    let mut from = match &msg.from {
        Some(user) => participant(user),
        None => Participant::new(msg.chat.id.0, msg.chat.first_name().unwrap_or_default()),
    };
    // In a private chat the chat id is the user id; keying by chat keeps
    // replies addressable.
    from.id = msg.chat.id.0.into();

    Some(InboundEvent::from_text(from, text, MessageRef(msg.id.0)))
}

fn callback_event(query: CallbackQuery) -> Option<InboundEvent> {
    let payload = query.data.clone()?;
    let mut from = participant(&query.from);
    if let Some(message) = &query.message {
        from.id = message.chat().id.0.into();
    }
    Some(InboundEvent::Action {
        from,
        action_id: query.id.clone(),
        payload,
        message: query.message.as_ref().map(|m| MessageRef(m.id().0)),
    })
}

fn participant(user: &User) -> Participant {
    let mut participant = Participant::new(user.id.0 as i64, user.first_name.clone());
    participant.last_name = user.last_name.clone();
    participant.username = user.username.clone();
    participant
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        relaydesk_common::Identity,
        rstest::rstest,
        serde_json::{Value, json},
    };

    fn update(body: Value) -> Update {
        serde_json::from_str(&body.to_string()).expect("deserialize update")
    }

    fn private_message(extra: Value) -> Value {
        let mut message = json!({
            "message_id": 11,
            "date": 1,
            "chat": { "id": 42, "type": "private", "first_name": "Alice" },
            "from": {
                "id": 42,
                "is_bot": false,
                "first_name": "Alice",
                "last_name": "Smith",
                "username": "alice"
            }
        });
        for (k, v) in extra.as_object().unwrap() {
            message[k] = v.clone();
        }
        json!({ "update_id": 1, "message": message })
    }

    #[test]
    fn text_message_becomes_message_event() {
        let event = to_inbound(update(private_message(json!({ "text": "hello" })))).unwrap();
        let InboundEvent::Message {
            from,
            text,
            message,
        } = event
        else {
            panic!("expected message event");
        };
        assert_eq!(from.id, Identity::new(42));
        assert_eq!(from.full_name(), "Alice Smith");
        assert_eq!(from.username.as_deref(), Some("alice"));
        assert_eq!(text.as_deref(), Some("hello"));
        assert_eq!(message, MessageRef(11));
    }

    #[test]
    fn slash_text_becomes_command() {
        let event = to_inbound(update(private_message(json!({ "text": "/start@relay_bot" }))))
            .unwrap();
        assert!(matches!(event, InboundEvent::Command { ref command, .. } if command == "start"));
    }

    #[test]
    fn captioned_photo_is_copied_not_retyped() {
        let event = to_inbound(update(private_message(json!({
            "photo": [{ "file_id": "f", "file_unique_id": "u", "width": 1, "height": 1 }],
            "caption": "look at this"
        }))))
        .unwrap();
        assert!(matches!(event, InboundEvent::Message { text: None, .. }));
    }

    #[rstest]
    #[case::group(json!({ "id": -100, "type": "group", "title": "Ops" }))]
    #[case::supergroup(json!({ "id": -1001, "type": "supergroup", "title": "Ops" }))]
    fn group_messages_are_dropped(#[case] chat: Value) {
        let body = json!({
            "update_id": 3,
            "message": {
                "message_id": 1,
                "date": 1,
                "chat": chat,
                "from": { "id": 42, "is_bot": false, "first_name": "Alice" },
                "text": "hi"
            }
        });
        assert!(to_inbound(update(body)).is_none());
    }

    #[test]
    fn callback_query_becomes_action() {
        let body = json!({
            "update_id": 4,
            "callback_query": {
                "id": "cb-9",
                "from": { "id": 100, "is_bot": false, "first_name": "Agent" },
                "chat_instance": "ci",
                "data": "start:42",
                "message": {
                    "message_id": 60,
                    "date": 1,
                    "chat": { "id": 100, "type": "private", "first_name": "Agent" },
                    "text": "New Live Chat Request"
                }
            }
        });
        let event = to_inbound(update(body)).unwrap();
        assert_eq!(event, InboundEvent::Action {
            from: Participant::new(100, "Agent"),
            action_id: "cb-9".into(),
            payload: "start:42".into(),
            message: Some(MessageRef(60)),
        });
    }

    #[test]
    fn callback_without_data_is_dropped() {
        let body = json!({
            "update_id": 5,
            "callback_query": {
                "id": "cb-10",
                "from": { "id": 100, "is_bot": false, "first_name": "Agent" },
                "chat_instance": "ci",
                "game_short_name": "g"
            }
        });
        assert!(to_inbound(update(body)).is_none());
    }
}
