//! Load configuration via `config` crate with env-override support.

use std::{collections::HashMap, ops::Deref, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::types::{Res, Void};

/// Default Flowdock API endpoint.
fn default_flowdock_api_url() -> String {
    "https://api.flowdock.com".to_string()
}

/// Default response template.
fn default_message_format() -> String {
    "I'm currently away (from {{.From}} until {{.Until}}). I'll get back to you when I return.".to_string()
}

/// Default location linked from the reply suffix.
fn default_site_location() -> String {
    "https://github.com/milanaleksic/igor".to_string()
}

/// Default number of mentions fetched per pass.
fn default_mention_limit() -> u32 {
    10
}

/// Default number of seconds between poll passes.
fn default_poll_interval_seconds() -> u64 {
    60
}

/// Configuration for igor.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Identity this responder answers for, used in logs (`IDENTITY`).
    pub identity: String,
    /// Flowdock username; mentions must contain `@<username>` (`FLOWDOCK_USERNAME`).
    pub flowdock_username: String,
    /// Flowdock personal API token (`FLOWDOCK_TOKEN`).
    pub flowdock_token: String,
    /// Flowdock API base URL (`FLOWDOCK_API_URL`).
    #[serde(default = "default_flowdock_api_url")]
    pub flowdock_api_url: String,
    /// Response template; may reference `{{.From}}` and `{{.Until}}` (`MESSAGE_FORMAT`).
    #[serde(default = "default_message_format")]
    pub message_format: String,
    /// Start of the away window, RFC 3339 (`ACTIVE_FROM`).
    pub active_from: DateTime<Utc>,
    /// End of the away window, RFC 3339 (`ACTIVE_UNTIL`).
    pub active_until: DateTime<Utc>,
    /// Link target of the "Powered by" suffix (`SITE_LOCATION`).
    #[serde(default = "default_site_location")]
    pub site_location: String,
    /// How many mentions to fetch per pass (`MENTION_LIMIT`).
    #[serde(default = "default_mention_limit")]
    pub mention_limit: u32,
    /// Seconds between poll passes; `0` runs a single pass and exits (`POLL_INTERVAL_SECONDS`).
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// When each requester (by display name) was last answered.
    #[serde(default)]
    pub last_communication: HashMap<String, DateTime<Utc>>,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder();

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        cfg = cfg.add_source(config::Environment::default().prefix("IGOR"));

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check the values the rest of the application relies on.
    pub fn validate(&self) -> Void {
        if self.identity.trim().is_empty() {
            return Err(anyhow::anyhow!("Identity must not be empty."));
        }

        if self.flowdock_username.trim().is_empty() {
            return Err(anyhow::anyhow!("Flowdock username must not be empty."));
        }

        if self.flowdock_token.trim().is_empty() {
            return Err(anyhow::anyhow!("Flowdock token must not be empty."));
        }

        if self.active_from > self.active_until {
            return Err(anyhow::anyhow!("Active window starts ({}) after it ends ({}).", self.active_from, self.active_until));
        }

        if self.mention_limit < 1 || self.mention_limit > 100 {
            return Err(anyhow::anyhow!("Mention limit must be between 1 and 100."));
        }

        Ok(())
    }
}
