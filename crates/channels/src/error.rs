use {relaydesk_common::Identity, std::error::Error as StdError};

/// Crate-wide result type for gateway and store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared by every collaborator trait.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// The recipient can never be reached again (blocked the bot, deleted
    /// account, chat not found).
    #[error("{identity} is unreachable: {reason}")]
    Unreachable { identity: Identity, reason: String },

    /// Operation is currently unavailable (not configured/ready).
    #[error("channel operation unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unreachable(identity: Identity, reason: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            identity,
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Permanent failures are not worth retrying and end any session with
    /// the affected identity.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::InvalidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_is_permanent() {
        let err = Error::unreachable(Identity::new(9), "bot was blocked by the user");
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "9 is unreachable: bot was blocked by the user");
    }

    #[test]
    fn external_is_transient() {
        let err = Error::external("send message", std::io::Error::other("reset"));
        assert!(!err.is_permanent());
        assert!(!Error::unavailable("not started").is_permanent());
    }
}
