use {
    async_trait::async_trait,
    relaydesk_common::{Identity, MessageRef},
    serde::{Deserialize, Serialize},
};

use crate::Result;

// ── Outbound formatting ─────────────────────────────────────────────────────

/// How the gateway should interpret message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// Delivered verbatim. Used for relayed user content.
    #[default]
    Plain,
    /// Telegram-flavoured HTML (`<b>`, `<i>`, `<code>`). Callers escape any
    /// user-provided fragments.
    Html,
}

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ButtonTarget {
    /// Opaque payload delivered back as an [`crate::InboundEvent::Action`].
    Action(String),
    /// External link.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub target: ButtonTarget,
}

impl Button {
    pub fn action(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Action(payload.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Url(url.into()),
        }
    }
}

/// Keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyboard {
    /// Buttons attached to the message itself, one inner `Vec` per row.
    Inline(Vec<Vec<Button>>),
    /// Buttons replacing the client's text keyboard; pressing one sends its
    /// label as ordinary text.
    Reply { rows: Vec<Vec<String>>, one_time: bool },
    /// Remove a previously shown reply keyboard.
    RemoveReply,
}

/// Options for [`MessagingGateway::send_message`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub format: TextFormat,
    pub keyboard: Option<Keyboard>,
}

impl SendOptions {
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn html() -> Self {
        Self {
            format: TextFormat::Html,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Single-column inline keyboard, the layout every relay prompt uses.
    #[must_use]
    pub fn with_buttons(self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.with_keyboard(Keyboard::Inline(
            buttons.into_iter().map(|b| vec![b]).collect(),
        ))
    }
}

// ── Gateway trait ───────────────────────────────────────────────────────────

/// The external messaging transport.
///
/// Implementations map permanent delivery failures to
/// [`crate::Error::Unreachable`] so the relay can tear down affected sessions.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a new message and return its reference in the recipient's chat.
    async fn send_message(
        &self,
        to: Identity,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef>;

    /// Forward an existing message, keeping the original author attribution.
    async fn forward_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef>;

    /// Re-send an existing message without author attribution.
    async fn copy_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef>;

    async fn delete_message(&self, chat: Identity, message: MessageRef) -> Result<()>;

    /// Acknowledge an inline action, optionally with a short toast. No-op by default.
    async fn answer_action(&self, _action_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }
}
