//! User-facing text in every supported language, plus the English-only
//! agent texts. All strings are Telegram HTML; interpolated user input goes
//! through [`escape_html`].

use relaydesk_common::Identity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    En,
    Bn,
}

/// Shown before the user has picked a language, so it is bilingual.
pub const LANGUAGE_PROMPT: &str =
    "Please select your preferred language:\n\nঅনুগ্রহ করে আপনার পছন্দের ভাষা নির্বাচন করুন:";

/// Reply-keyboard label used by the legacy stop keyword.
pub const LEGACY_STOP_LABEL: &str = "Stop Conversation";

impl Language {
    pub const ALL: [Self; 2] = [Self::Bn, Self::En];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Bn => "bn",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "bn" => Some(Self::Bn),
            _ => None,
        }
    }

    /// Label of the language's own button in the language prompt.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Bn => "বাংলা",
        }
    }

    pub fn banned(self) -> &'static str {
        match self {
            Self::En => "<b>You are banned from using this bot.</b>",
            Self::Bn => "<b>আপনাকে এই বট ব্যবহার করা থেকে নিষিদ্ধ করা হয়েছে।</b>",
        }
    }

    pub fn menu(self) -> &'static str {
        match self {
            Self::En => "<b>You have selected English.</b>\n\nPlease select your preferred option:",
            Self::Bn => {
                "<b>আপনি বাংলা ভাষা নির্বাচন করেছেন।</b>\n\nঅনুগ্রহ করে আপনার পছন্দের অপশন নির্বাচন করুন:"
            },
        }
    }

    pub fn join_channel_button(self) -> &'static str {
        match self {
            Self::En => "Join Our Channel",
            Self::Bn => "আমাদের চ্যানেল জয়েন করুন",
        }
    }

    pub fn customer_service_button(self) -> &'static str {
        match self {
            Self::En => "Customer Service",
            Self::Bn => "কাস্টমার সার্ভিস",
        }
    }

    pub fn name_prompt(self) -> &'static str {
        match self {
            Self::En => "Please enter your name:",
            Self::Bn => "অনুগ্রহ করে আপনার নাম লিখুন:",
        }
    }

    pub fn name_rejected(self) -> &'static str {
        match self {
            Self::En => "Your name cannot be empty. Please enter your name:",
            Self::Bn => "নাম খালি রাখা যাবে না। অনুগ্রহ করে আপনার নাম লিখুন:",
        }
    }

    pub fn request_sent(self) -> &'static str {
        match self {
            Self::En => {
                "<b>Your request has been sent to customer service. Please wait for a response.</b>"
            },
            Self::Bn => {
                "<b>আপনার অনুরোধ কাস্টমার সার্ভিসে পাঠানো হয়েছে। অনুগ্রহ করে উত্তরের জন্য অপেক্ষা করুন।</b>"
            },
        }
    }

    pub fn request_pending(self) -> &'static str {
        match self {
            Self::En => "<b>Your request is already with customer service.</b>",
            Self::Bn => "<b>আপনার অনুরোধ ইতিমধ্যে কাস্টমার সার্ভিসে আছে।</b>",
        }
    }

    pub fn request_denied(self) -> &'static str {
        match self {
            Self::En => "<b>Your request has been denied by customer service.</b>",
            Self::Bn => "<b>কাস্টমার সার্ভিস আপনার অনুরোধ প্রত্যাখ্যান করেছে।</b>",
        }
    }

    pub fn request_cancelled(self) -> &'static str {
        match self {
            Self::En => "Your request has been cancelled.",
            Self::Bn => "আপনার অনুরোধ বাতিল করা হয়েছে।",
        }
    }

    pub fn nothing_to_cancel(self) -> &'static str {
        match self {
            Self::En => "You have no pending request.",
            Self::Bn => "আপনার কোনো অপেক্ষমাণ অনুরোধ নেই।",
        }
    }

    pub fn support_unavailable(self) -> &'static str {
        match self {
            Self::En => "Customer service is unavailable right now. Please try again later.",
            Self::Bn => "এই মুহূর্তে কাস্টমার সার্ভিস পাওয়া যাচ্ছে না। অনুগ্রহ করে পরে আবার চেষ্টা করুন।",
        }
    }

    pub fn session_started(self) -> &'static str {
        match self {
            Self::En => "<b>Customer service has started a conversation with you.</b>",
            Self::Bn => "<b>কাস্টমার সার্ভিস আপনার সাথে কথোপকথন শুরু করেছে।</b>",
        }
    }

    pub fn session_stopped(self) -> &'static str {
        match self {
            Self::En => "<b>Conversation has been stopped.</b>",
            Self::Bn => "<b>কথোপকথন বন্ধ করা হয়েছে।</b>",
        }
    }

    pub fn session_stopped_by_agent(self) -> &'static str {
        match self {
            Self::En => "<b>The conversation has been stopped by customer service.</b>",
            Self::Bn => "<b>কাস্টমার সার্ভিস কথোপকথন বন্ধ করেছে।</b>",
        }
    }

    pub fn already_in_session(self) -> &'static str {
        match self {
            Self::En => "<b>You are already in a conversation with customer service.</b>",
            Self::Bn => "<b>আপনি ইতিমধ্যে কাস্টমার সার্ভিসের সাথে কথোপকথনে আছেন।</b>",
        }
    }

    pub fn no_active_session(self) -> &'static str {
        match self {
            Self::En => "You have no active conversation.",
            Self::Bn => "আপনার কোনো চলমান কথোপকথন নেই।",
        }
    }

    pub fn counterpart_unreachable(self) -> &'static str {
        match self {
            Self::En => "<b>Your message could not be delivered. The conversation has ended.</b>",
            Self::Bn => "<b>আপনার বার্তা পৌঁছানো যায়নি। কথোপকথন শেষ হয়েছে।</b>",
        }
    }

    pub fn auto_reply(self, support_url: Option<&str>) -> String {
        let base = match self {
            Self::En => "Thank you for your message! Our support team will get back to you shortly.",
            Self::Bn => "আপনার বার্তার জন্য ধন্যবাদ! আমাদের সাপোর্ট টিম শীঘ্রই আপনার সাথে যোগাযোগ করবে।",
        };
        match support_url {
            Some(url) => {
                let more = match self {
                    Self::En => "Meanwhile, you can also join our support group at:",
                    Self::Bn => "এর মধ্যে আপনি আমাদের সাপোর্ট গ্রুপেও যোগ দিতে পারেন:",
                };
                format!("{base} {more} {}", escape_html(url))
            },
            None => base.to_string(),
        }
    }
}

/// Agent-facing texts. Agents share one language.
pub mod agent {
    use super::*;

    pub const DENY_BUTTON: &str = "Deny";
    pub const START_BUTTON: &str = "Start Conversation";
    pub const END_BUTTON: &str = "End Conversation";

    pub fn new_request(
        user: Identity,
        full_name: &str,
        display_name: &str,
        username: Option<&str>,
        language: Language,
    ) -> String {
        let handle = username
            .map(|u| format!("\n<b>Handle:</b> @{}", escape_html(u)))
            .unwrap_or_default();
        format!(
            "<b>New Live Chat Request</b>\n\n<b>User:</b> {}\n<b>Name:</b> {}{handle}\n<b>ID:</b> <code>{user}</code>\n<b>Language:</b> {}",
            escape_html(full_name),
            escape_html(display_name),
            language.code(),
        )
    }

    pub fn session_started(user: Identity, display_name: &str, legacy_keyboard: bool) -> String {
        let how_to_stop = if legacy_keyboard {
            "To stop, click the button below or send /stop."
        } else {
            "To stop, press End Conversation or send /stop."
        };
        format!(
            "<b>You have started a conversation with {} (<code>{user}</code>).</b>\nMessages you send here are relayed to them. {how_to_stop}",
            escape_html(display_name),
        )
    }

    pub fn stopped_by_user() -> &'static str {
        "<b>The conversation has been stopped by the user.</b>"
    }

    pub fn already_handled() -> &'static str {
        "This request was already handled."
    }

    pub fn busy() -> &'static str {
        "You are already in a conversation. End it before starting another."
    }

    pub fn user_busy(user: Identity) -> String {
        format!("User <code>{user}</code> is already in a conversation.")
    }

    /// Toast shown to the agent who denied a request.
    pub fn denied(user: Identity) -> String {
        format!("Request from {user} denied.")
    }

    pub fn user_unreachable(user: Identity) -> String {
        format!("<b>User <code>{user}</code> can no longer be reached. The conversation has ended.</b>")
    }

    pub fn banned(user: Identity, newly: bool) -> String {
        if newly {
            format!("User <code>{user}</code> has been banned.")
        } else {
            format!("User <code>{user}</code> is already banned.")
        }
    }

    pub fn unbanned(user: Identity, was_banned: bool) -> String {
        if was_banned {
            format!("User <code>{user}</code> has been unbanned.")
        } else {
            format!("User <code>{user}</code> is not banned.")
        }
    }

    pub fn cannot_ban_agent() -> &'static str {
        "Agents cannot be banned."
    }

    pub fn ban_list(users: &[Identity]) -> String {
        if users.is_empty() {
            return "No banned users.".to_string();
        }
        let lines: Vec<String> = users.iter().map(|u| format!("<code>{u}</code>")).collect();
        format!("<b>Banned users ({})</b>\n{}", users.len(), lines.join("\n"))
    }

    pub fn session_closed_by_ban(user: Identity) -> String {
        format!("<b>User <code>{user}</code> was banned. The conversation has ended.</b>")
    }

    pub fn broadcast_summary(delivered: usize, failed: usize) -> String {
        format!("Broadcast delivered to {delivered} user(s), {failed} failed.")
    }

    pub fn usage(command: &str) -> String {
        match command {
            "broadcast" => "Usage: /broadcast &lt;text&gt;".to_string(),
            other => format!("Usage: /{other} &lt;user id&gt;"),
        }
    }

    pub fn help() -> &'static str {
        "<b>Agent commands</b>\n\
         /ban &lt;id&gt; - ban a user\n\
         /unban &lt;id&gt; - lift a ban\n\
         /banned - list banned users\n\
         /broadcast &lt;text&gt; - message every known user\n\
         /stop - end the current conversation"
    }
}

/// Escape the three characters Telegram HTML treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
