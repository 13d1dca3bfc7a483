//! Session Router: the symmetric pairing table.
//!
//! A session `{A, B}` is stored as the two directed entries `A → B` and
//! `B → A`, always inserted and removed together under one lock so the
//! table is symmetric whenever it is observable. Gateway calls happen after
//! the lock is released.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use {
    relaydesk_channels::{MessagingGateway, SendOptions},
    relaydesk_common::{Identity, MessageRef},
    tracing::{debug, info, warn},
};

use crate::{Error, Result, delivery};

/// Content relayed across a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relayed {
    /// Plain text, re-sent verbatim.
    Text(String),
    /// An existing message (media, stickers, commands) copied by reference.
    Copy(MessageRef),
}

pub struct SessionRouter {
    pairs: Mutex<HashMap<Identity, Identity>>,
    gateway: Arc<dyn MessagingGateway>,
}

impl SessionRouter {
    pub fn new(gateway: Arc<dyn MessagingGateway>) -> Self {
        Self {
            pairs: Mutex::new(HashMap::new()),
            gateway,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Identity, Identity>> {
        self.pairs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bridge `user` and `agent`. Fails if either is already bridged.
    pub fn open(&self, user: Identity, agent: Identity) -> Result<()> {
        if user == agent {
            return Err(Error::invalid_state(format!(
                "{user} cannot be paired with itself"
            )));
        }
        let mut pairs = self.lock();
        for id in [user, agent] {
            if pairs.contains_key(&id) {
                return Err(Error::AlreadyPaired { identity: id });
            }
        }
        pairs.insert(user, agent);
        pairs.insert(agent, user);
        drop(pairs);
        info!(user = %user, agent = %agent, "session opened");
        Ok(())
    }

    pub fn is_active(&self, id: Identity) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn peer_of(&self, id: Identity) -> Option<Identity> {
        self.lock().get(&id).copied()
    }

    /// End the session `by` is part of and return the counterpart.
    pub fn close(&self, by: Identity) -> Result<Identity> {
        let mut pairs = self.lock();
        let peer = pairs
            .remove(&by)
            .ok_or(Error::NotActive { identity: by })?;
        pairs.remove(&peer);
        drop(pairs);
        info!(by = %by, peer = %peer, "session closed");
        Ok(peer)
    }

    /// Remove the session `{a, b}` only if it is still the one in the table.
    /// Returns `false` when it was already closed or replaced.
    pub fn close_pair(&self, a: Identity, b: Identity) -> bool {
        let mut pairs = self.lock();
        if pairs.get(&a) != Some(&b) {
            return false;
        }
        pairs.remove(&a);
        pairs.remove(&b);
        true
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver `content` from `from` to its counterpart and return the
    /// counterpart.
    ///
    /// A permanent delivery failure closes the session before the error is
    /// returned, so the caller only has to notify `from`.
    pub async fn forward(&self, from: Identity, content: Relayed) -> Result<Identity> {
        let Some(to) = self.peer_of(from) else {
            debug!(from = %from, "forward without an active session");
            return Err(Error::NotActive { identity: from });
        };

        let gateway = self.gateway.as_ref();
        let sent = match &content {
            Relayed::Text(text) => delivery::send(gateway, to, text, SendOptions::plain()).await,
            Relayed::Copy(message) => delivery::copy(gateway, to, from, *message).await,
        };

        match sent {
            Ok(_) => Ok(to),
            Err(err) => {
                if err.unreachable_identity().is_some() && self.close_pair(from, to) {
                    warn!(from = %from, to = %to, error = %err, "counterpart unreachable, session closed");
                } else {
                    warn!(from = %from, to = %to, error = %err, "forward failed");
                }
                Err(err)
            },
        }
    }
}
