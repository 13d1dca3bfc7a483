use relaydesk_common::{MessageRef, Participant};

/// An inbound event, normalized by the gateway adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A `/command [args]` message. The bot-name suffix (`/ban@mybot`) is
    /// already stripped and the command lowercased.
    Command {
        from: Participant,
        command: String,
        args: String,
        message: MessageRef,
    },
    /// Any other message. `text` is `None` for media without a caption.
    Message {
        from: Participant,
        text: Option<String>,
        message: MessageRef,
    },
    /// An inline button press carrying the button's opaque payload.
    Action {
        from: Participant,
        action_id: String,
        payload: String,
        /// The message the button was attached to, if still accessible.
        message: Option<MessageRef>,
    },
}

impl InboundEvent {
    /// Classify a text message as a command or plain message.
    pub fn from_text(from: Participant, text: Option<String>, message: MessageRef) -> Self {
        match text.as_deref().and_then(parse_command) {
            Some((command, args)) => Self::Command {
                from,
                command,
                args,
                message,
            },
            None => Self::Message {
                from,
                text,
                message,
            },
        }
    }

    pub fn sender(&self) -> &Participant {
        match self {
            Self::Command { from, .. } | Self::Message { from, .. } | Self::Action { from, .. } => {
                from
            },
        }
    }
}

/// Split `/name@bot args` into `("name", "args")`.
fn parse_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name.to_ascii_lowercase(), args.to_string()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Participant {
        Participant::new(1, "Alice")
    }

    #[test]
    fn command_with_args() {
        let ev = InboundEvent::from_text(alice(), Some("/ban 12345".into()), MessageRef(3));
        assert_eq!(ev, InboundEvent::Command {
            from: alice(),
            command: "ban".into(),
            args: "12345".into(),
            message: MessageRef(3),
        });
    }

    #[test]
    fn command_strips_bot_suffix_and_case() {
        let (name, args) = parse_command("/Start@relay_bot").unwrap();
        assert_eq!(name, "start");
        assert_eq!(args, "");
    }

    #[test]
    fn multi_word_args_are_kept_intact() {
        let (name, args) = parse_command("/broadcast  Service is back   online ").unwrap();
        assert_eq!(name, "broadcast");
        assert_eq!(args, "Service is back   online");
    }

    #[test]
    fn plain_text_and_paths_are_messages() {
        assert!(parse_command("hello").is_none());
        assert!(parse_command("/").is_none());
        assert!(parse_command("/usr/bin").is_none());
        let ev = InboundEvent::from_text(alice(), None, MessageRef(1));
        assert!(matches!(ev, InboundEvent::Message { text: None, .. }));
    }

    #[test]
    fn sender_is_exposed_for_every_variant() {
        let ev = InboundEvent::Action {
            from: alice(),
            action_id: "q1".into(),
            payload: "lang:en".into(),
            message: None,
        };
        assert_eq!(ev.sender().id, alice().id);
    }
}
