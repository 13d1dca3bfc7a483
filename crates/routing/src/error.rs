use relaydesk_common::Identity;

/// Routing failures. None of them is fatal to the process; the relay maps
/// each to a log line and, where useful, a short notice.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// One side of a requested session is already bridged to someone else.
    #[error("{identity} is already in a conversation")]
    AlreadyPaired { identity: Identity },

    /// The identity has no active session.
    #[error("{identity} has no active conversation")]
    NotActive { identity: Identity },

    /// Another agent acted on the request first, or it was withdrawn.
    #[error("support request from {user} was already resolved")]
    AlreadyResolved { user: Identity },

    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Malformed user or agent input.
    #[error("{message}")]
    Validation { message: String },

    #[error(transparent)]
    Gateway(#[from] relaydesk_channels::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Benign races and out-of-order requests: logged, never shown to users.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPaired { .. }
                | Self::NotActive { .. }
                | Self::AlreadyResolved { .. }
                | Self::InvalidState { .. }
        )
    }

    /// The gateway reported that `identity`-side delivery can never succeed.
    #[must_use]
    pub fn unreachable_identity(&self) -> Option<Identity> {
        match self {
            Self::Gateway(relaydesk_channels::Error::Unreachable { identity, .. }) => {
                Some(*identity)
            },
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
