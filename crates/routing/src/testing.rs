//! Recording gateway used by the routing tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicI32, Ordering},
    },
};

use {
    async_trait::async_trait,
    relaydesk_channels::{ButtonTarget, Error, Keyboard, MessagingGateway, Result, SendOptions},
    relaydesk_common::{Identity, MessageRef},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outbound {
    Text {
        to: Identity,
        text: String,
        options: SendOptions,
        message: MessageRef,
    },
    Forward {
        to: Identity,
        from: Identity,
        message: MessageRef,
    },
    Copy {
        to: Identity,
        from: Identity,
        message: MessageRef,
    },
}

impl Outbound {
    pub(crate) fn to(&self) -> Identity {
        match self {
            Self::Text { to, .. } | Self::Forward { to, .. } | Self::Copy { to, .. } => *to,
        }
    }
}

#[derive(Default)]
struct State {
    outbound: Vec<Outbound>,
    deleted: Vec<(Identity, MessageRef)>,
    answered: Vec<(String, Option<String>)>,
    attempts: HashMap<Identity, usize>,
    failures: HashMap<Identity, VecDeque<Error>>,
    blocked: HashSet<Identity>,
}

/// In-memory [`MessagingGateway`] that records every successful call.
#[derive(Default)]
pub(crate) struct RecordingGateway {
    state: Mutex<State>,
    next_id: AtomicI32,
}

impl RecordingGateway {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::default(),
            next_id: AtomicI32::new(100),
        }
    }

    /// The next call addressed to `to` fails with `err`.
    pub(crate) fn fail_next(&self, to: Identity, err: Error) {
        self.lock().failures.entry(to).or_default().push_back(err);
    }

    /// Every call addressed to `to` fails permanently from now on.
    pub(crate) fn block(&self, to: Identity) {
        self.lock().blocked.insert(to);
    }

    pub(crate) fn outbound(&self) -> Vec<Outbound> {
        self.lock().outbound.clone()
    }

    pub(crate) fn outbound_to(&self, to: Identity) -> Vec<Outbound> {
        self.lock()
            .outbound
            .iter()
            .filter(|o| o.to() == to)
            .cloned()
            .collect()
    }

    pub(crate) fn texts_to(&self, to: Identity) -> Vec<String> {
        self.lock()
            .outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Text { to: t, text, .. } if *t == to => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Action payloads of the inline buttons attached to messages sent to `to`.
    pub(crate) fn actions_to(&self, to: Identity) -> Vec<String> {
        self.lock()
            .outbound
            .iter()
            .filter_map(|o| match o {
                Outbound::Text {
                    to: t,
                    options:
                        SendOptions {
                            keyboard: Some(Keyboard::Inline(rows)),
                            ..
                        },
                    ..
                } if *t == to => Some(rows.clone()),
                _ => None,
            })
            .flatten()
            .flatten()
            .filter_map(|b| match b.target {
                ButtonTarget::Action(payload) => Some(payload),
                ButtonTarget::Url(_) => None,
            })
            .collect()
    }

    pub(crate) fn deleted(&self) -> Vec<(Identity, MessageRef)> {
        self.lock().deleted.clone()
    }

    pub(crate) fn answered(&self) -> Vec<(String, Option<String>)> {
        self.lock().answered.clone()
    }

    pub(crate) fn attempts_to(&self, to: Identity) -> usize {
        self.lock().attempts.get(&to).copied().unwrap_or(0)
    }

    pub(crate) fn clear(&self) {
        let mut state = self.lock();
        state.outbound.clear();
        state.deleted.clear();
        state.answered.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn attempt(&self, to: Identity) -> Result<MessageRef> {
        let mut state = self.lock();
        *state.attempts.entry(to).or_default() += 1;
        if state.blocked.contains(&to) {
            return Err(Error::unreachable(to, "bot was blocked by the user"));
        }
        if let Some(err) = state.failures.get_mut(&to).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_message(
        &self,
        to: Identity,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef> {
        let message = self.attempt(to)?;
        self.lock().outbound.push(Outbound::Text {
            to,
            text: text.to_string(),
            options,
            message,
        });
        Ok(message)
    }

    async fn forward_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef> {
        let sent = self.attempt(to)?;
        self.lock().outbound.push(Outbound::Forward { to, from, message });
        Ok(sent)
    }

    async fn copy_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef> {
        let sent = self.attempt(to)?;
        self.lock().outbound.push(Outbound::Copy { to, from, message });
        Ok(sent)
    }

    async fn delete_message(&self, chat: Identity, message: MessageRef) -> Result<()> {
        self.lock().deleted.push((chat, message));
        Ok(())
    }

    async fn answer_action(&self, action_id: &str, text: Option<&str>) -> Result<()> {
        self.lock()
            .answered
            .push((action_id.to_string(), text.map(str::to_string)));
        Ok(())
    }
}
