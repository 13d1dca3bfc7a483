//! Participant identifiers shared by the routing core and the channel adapters.
//!
//! An [`Identity`] is always the numeric chat id. Adapters normalize at the
//! boundary so bans, sessions and pending requests are keyed by one type.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque, stable identifier of a chat participant (end user or agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(i64);

impl Identity {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for Identity {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| Error::InvalidIdentity {
                input: trimmed.to_string(),
            })
    }
}

/// Reference to a message that already exists in some chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub i32);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender of an inbound event, with the display metadata the gateway knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Identity,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<Identity>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }

    /// First and last name joined, falling back to the username.
    pub fn full_name(&self) -> String {
        let last = self.last_name.as_deref().unwrap_or("");
        let name = format!("{} {last}", self.first_name).trim().to_string();
        if name.is_empty() {
            self.username.clone().unwrap_or_default()
        } else {
            name
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_parses_signed_ids() {
        assert_eq!("12345".parse::<Identity>().unwrap(), Identity::new(12345));
        assert_eq!(
            " -100200 ".parse::<Identity>().unwrap(),
            Identity::new(-100200)
        );
    }

    #[test]
    fn identity_rejects_usernames() {
        let err = "@alice".parse::<Identity>().unwrap_err();
        assert_eq!(err, Error::InvalidIdentity {
            input: "@alice".into()
        });
        assert!(err.to_string().contains("invalid identity"));
    }

    #[test]
    fn identity_serializes_as_number() {
        let json = serde_json::to_string(&Identity::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn full_name_joins_and_trims() {
        let mut p = Participant::new(1, "Alice");
        assert_eq!(p.full_name(), "Alice");
        p.last_name = Some("Smith".into());
        assert_eq!(p.full_name(), "Alice Smith");
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let mut p = Participant::new(1, "");
        p.username = Some("alice".into());
        assert_eq!(p.full_name(), "alice");
    }
}
