use relaydesk_common::Identity;

/// The fixed set of privileged identities. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    members: Vec<Identity>,
}

impl AgentPool {
    pub fn new(members: impl IntoIterator<Item = Identity>) -> Self {
        let mut unique: Vec<Identity> = Vec::new();
        for id in members {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { members: unique }
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.members.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
