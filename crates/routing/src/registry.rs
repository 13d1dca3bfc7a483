//! Identity registry: the ban list.

use std::{collections::HashSet, sync::RwLock};

use relaydesk_common::Identity;

/// Set of banned identities, listed in insertion order.
///
/// Pure membership; enforcing the ban is the caller's job.
#[derive(Default)]
pub struct BanRegistry {
    inner: RwLock<BanSet>,
}

#[derive(Default)]
struct BanSet {
    order: Vec<Identity>,
    members: HashSet<Identity>,
}

impl BanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_banned(ids: impl IntoIterator<Item = Identity>) -> Self {
        let registry = Self::new();
        for id in ids {
            registry.ban(id);
        }
        registry
    }

    pub fn is_banned(&self, id: Identity) -> bool {
        let set = self.inner.read().unwrap_or_else(|e| e.into_inner());
        set.members.contains(&id)
    }

    /// Returns `true` if `id` was not banned before.
    pub fn ban(&self, id: Identity) -> bool {
        let mut set = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !set.members.insert(id) {
            return false;
        }
        set.order.push(id);
        true
    }

    /// Returns `true` if `id` was banned before.
    pub fn unban(&self, id: Identity) -> bool {
        let mut set = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !set.members.remove(&id) {
            return false;
        }
        set.order.retain(|entry| *entry != id);
        true
    }

    /// Snapshot of the ban list; later mutations do not affect it.
    pub fn list_banned(&self) -> Vec<Identity> {
        let set = self.inner.read().unwrap_or_else(|e| e.into_inner());
        set.order.clone()
    }

    pub fn len(&self) -> usize {
        let set = self.inner.read().unwrap_or_else(|e| e.into_inner());
        set.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> Identity {
        Identity::new(raw)
    }

    #[test]
    fn ban_then_unban() {
        let bans = BanRegistry::new();
        assert!(!bans.is_banned(id(1)));
        assert!(bans.ban(id(1)));
        assert!(bans.is_banned(id(1)));
        assert!(bans.unban(id(1)));
        assert!(!bans.is_banned(id(1)));
    }

    #[test]
    fn ban_is_idempotent() {
        let bans = BanRegistry::new();
        assert!(bans.ban(id(1)));
        assert!(!bans.ban(id(1)));
        assert!(bans.is_banned(id(1)));
        assert_eq!(bans.list_banned(), vec![id(1)]);
    }

    #[test]
    fn unban_non_member_is_noop() {
        let bans = BanRegistry::with_banned([id(2)]);
        assert!(!bans.unban(id(1)));
        assert!(!bans.unban(id(1)));
        assert_eq!(bans.list_banned(), vec![id(2)]);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let bans = BanRegistry::with_banned([id(30), id(10), id(20)]);
        bans.unban(id(10));
        bans.ban(id(10));
        assert_eq!(bans.list_banned(), vec![id(30), id(20), id(10)]);
    }

    #[test]
    fn list_is_a_snapshot() {
        let bans = BanRegistry::with_banned([id(1)]);
        let snapshot = bans.list_banned();
        bans.ban(id(2));
        bans.unban(id(1));
        assert_eq!(snapshot, vec![id(1)]);
        assert_eq!(bans.len(), 1);
    }

    #[test]
    fn ban_unban_round_trip_excludes_id() {
        let bans = BanRegistry::new();
        bans.ban(id(7));
        bans.unban(id(7));
        assert!(!bans.list_banned().contains(&id(7)));
        assert!(bans.is_empty());
    }
}
