//! Inline-button payload codec.
//!
//! Payloads are `"<verb>:<arg>"` strings so the identity survives the
//! gateway's opaque round trip. Telegram caps callback data at 64 bytes,
//! which every variant here stays well below.

use std::{fmt, str::FromStr};

use relaydesk_common::Identity;

use crate::{Error, i18n::Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Language picked from the `/start` prompt.
    SelectLanguage(Language),
    /// "Customer Service" entry of the main menu.
    RequestSupport,
    /// Agent accepts the support request of the embedded user.
    Start(Identity),
    /// Agent declines the support request of the embedded user.
    Deny(Identity),
    /// Agent ends the session with the embedded user.
    End(Identity),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectLanguage(lang) => write!(f, "lang:{}", lang.code()),
            Self::RequestSupport => write!(f, "support"),
            Self::Start(user) => write!(f, "start:{user}"),
            Self::Deny(user) => write!(f, "deny:{user}"),
            Self::End(user) => write!(f, "end:{user}"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = match payload.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (payload, None),
        };

        let identity = |arg: Option<&str>| -> Result<Identity, Error> {
            arg.ok_or_else(|| Error::validation(format!("action {verb:?} needs an identity")))?
                .parse::<Identity>()
                .map_err(|e| Error::validation(e.to_string()))
        };

        match verb {
            "lang" => arg
                .and_then(Language::from_code)
                .map(Self::SelectLanguage)
                .ok_or_else(|| Error::validation(format!("unknown language in {payload:?}"))),
            "support" => Ok(Self::RequestSupport),
            "start" => Ok(Self::Start(identity(arg)?)),
            "deny" => Ok(Self::Deny(identity(arg)?)),
            "end" => Ok(Self::End(identity(arg)?)),
            _ => Err(Error::validation(format!("unknown action {payload:?}"))),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("lang:en", Action::SelectLanguage(Language::En))]
    #[case("lang:bn", Action::SelectLanguage(Language::Bn))]
    #[case("support", Action::RequestSupport)]
    #[case("start:123456789", Action::Start(Identity::new(123456789)))]
    #[case("deny:-42", Action::Deny(Identity::new(-42)))]
    #[case("end:7", Action::End(Identity::new(7)))]
    fn decodes(#[case] payload: &str, #[case] expected: Action) {
        assert_eq!(payload.parse::<Action>().unwrap(), expected);
        assert_eq!(expected.to_string(), payload);
    }

    #[rstest]
    #[case("")]
    #[case("start")]
    #[case("start:")]
    #[case("start:alice")]
    #[case("lang:fr")]
    #[case("start_chat_123")]
    fn rejects_malformed(#[case] payload: &str) {
        assert!(matches!(
            payload.parse::<Action>(),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn payloads_fit_telegram_callback_limit() {
        let worst = Action::Start(Identity::new(i64::MIN)).to_string();
        assert!(worst.len() <= 64);
    }
}
