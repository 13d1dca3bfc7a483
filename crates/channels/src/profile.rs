use std::{
    collections::{BTreeMap, HashMap},
    sync::RwLock,
};

use {
    async_trait::async_trait,
    relaydesk_common::{Identity, MessageRef},
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Persisted per-user profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Full name as reported by the messaging platform.
    pub full_name: Option<String>,
    pub username: Option<String>,
    /// Language code picked in the language prompt.
    pub language: Option<String>,
    /// Name the user typed when asking for support.
    pub display_name: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub language: Option<String>,
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn apply(&mut self, update: ProfileUpdate) {
        if update.full_name.is_some() {
            self.full_name = update.full_name;
        }
        if update.username.is_some() {
            self.username = update.username;
        }
        if update.language.is_some() {
            self.language = update.language;
        }
        if update.display_name.is_some() {
            self.display_name = update.display_name;
        }
    }
}

/// A message written outside any session, as it landed in an agent's chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRecord {
    pub agent: Identity,
    /// Id of the forwarded copy in the agent's chat.
    pub forwarded: MessageRef,
    pub from: Identity,
    /// Id of the original message in the sender's chat.
    pub original: MessageRef,
    pub sender_name: String,
    pub text: Option<String>,
    /// Unix seconds.
    pub at: i64,
}

/// Best-effort profile persistence. The relay logs failures and carries on.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save_profile(&self, id: Identity, update: ProfileUpdate) -> Result<()>;
    async fn get_profile(&self, id: Identity) -> Result<Option<UserProfile>>;

    /// Remember where an offline message came from, keyed by its forwarded copy.
    async fn record_forward(&self, record: ForwardRecord) -> Result<()>;
    async fn get_forward(
        &self,
        agent: Identity,
        forwarded: MessageRef,
    ) -> Result<Option<ForwardRecord>>;
}

/// Enumerable set of every identity that ever talked to the bot.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<Identity>>;
}

/// Process-local profile store, used in tests and when no database is configured.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<BTreeMap<Identity, UserProfile>>,
    forwards: RwLock<HashMap<(Identity, MessageRef), ForwardRecord>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn save_profile(&self, id: Identity, update: ProfileUpdate) -> Result<()> {
        let mut profiles = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        profiles.entry(id).or_default().apply(update);
        Ok(())
    }

    async fn get_profile(&self, id: Identity) -> Result<Option<UserProfile>> {
        let profiles = self.profiles.read().unwrap_or_else(|e| e.into_inner());
        Ok(profiles.get(&id).cloned())
    }

    async fn record_forward(&self, record: ForwardRecord) -> Result<()> {
        let mut forwards = self.forwards.write().unwrap_or_else(|e| e.into_inner());
        forwards.insert((record.agent, record.forwarded), record);
        Ok(())
    }

    async fn get_forward(
        &self,
        agent: Identity,
        forwarded: MessageRef,
    ) -> Result<Option<ForwardRecord>> {
        let forwards = self.forwards.read().unwrap_or_else(|e| e.into_inner());
        Ok(forwards.get(&(agent, forwarded)).cloned())
    }
}

#[async_trait]
impl UserDirectory for MemoryProfileStore {
    async fn list_users(&self) -> Result<Vec<Identity>> {
        let profiles = self.profiles.read().unwrap_or_else(|e| e.into_inner());
        Ok(profiles.keys().copied().collect())
    }
}
