use {
    chrono::{DateTime, Timelike, Utc},
    chrono_tz::Tz,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl PartOfDay {
    /// 05–12 morning, 12–17 afternoon, 17–21 evening, otherwise night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn salutation(self) -> &'static str {
        match self {
            Self::Morning => "Good Morning",
            Self::Afternoon => "Good Afternoon",
            Self::Evening => "Good Evening",
            Self::Night => "Good Night",
        }
    }
}

/// Greeting line sent in reply to `/start`, e.g. `Good Evening Alice Smith!`.
pub fn greeting(now: DateTime<Utc>, tz: Tz, full_name: &str) -> String {
    let hour = now.with_timezone(&tz).hour();
    let salutation = PartOfDay::from_hour(hour).salutation();
    if full_name.is_empty() {
        format!("{salutation}!")
    } else {
        format!("{salutation} {full_name}!")
    }
}
