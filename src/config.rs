use std::fmt;

use anyhow::Context as _;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Runtime settings read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub bot_token: String,
    pub admin_id: i64,
    /// Channel holding the pinned catalog and uploaded pages: a numeric id or `@name`.
    pub channel_id: String,
    pub api_base: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bot_token", &"<redacted>")
            .field("admin_id", &self.admin_id)
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| -> anyhow::Result<String> {
            let value = lookup(key).with_context(|| format!("{key} is required"))?;
            let value = value.trim().to_owned();
            if value.is_empty() {
                anyhow::bail!("{key} is empty");
            }
            Ok(value)
        };

        let bot_token = required("TELEGRAM_TOKEN")?;
        let raw_admin = required("ADMIN_USER_ID")?;
        let admin_id = raw_admin
            .parse::<i64>()
            .with_context(|| format!("invalid ADMIN_USER_ID={raw_admin:?}. expected an integer user id"))?;
        if admin_id == 0 {
            anyhow::bail!("ADMIN_USER_ID must not be 0");
        }
        let channel_id = required("CHANNEL_ID")?;
        let api_base = lookup("SHELFBOT_API_BASE")
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());

        Ok(Self {
            bot_token,
            admin_id,
            channel_id,
            api_base,
        })
    }
}
