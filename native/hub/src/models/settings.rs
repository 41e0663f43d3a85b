use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

fn default_interaction_poll_ms() -> u64 {
    5_000
}

fn default_progress_poll_ms() -> u64 {
    1_000
}

fn default_account_poll_ms() -> u64 {
    60_000
}

#[derive(derive_more::Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Address of the web interface, e.g. `http://127.0.0.1:8001`
    pub server_url: String,
    /// Leave empty to skip logging in
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    #[debug(skip)]
    pub password: String,
    #[serde(default = "default_interaction_poll_ms")]
    pub interaction_poll_ms: u64,
    #[serde(default = "default_progress_poll_ms")]
    pub progress_poll_ms: u64,
    #[serde(default = "default_account_poll_ms")]
    pub account_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8001".to_string(),
            username: String::new(),
            password: String::new(),
            interaction_poll_ms: default_interaction_poll_ms(),
            progress_poll_ms: default_progress_poll_ms(),
            account_poll_ms: default_account_poll_ms(),
        }
    }
}

/// How often each resource is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub interactions: Duration,
    pub progress: Duration,
    pub accounts: Duration,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.server_url.starts_with("http://") || self.server_url.starts_with("https://"),
            "Server URL must start with http:// or https://"
        );
        ensure!(
            self.interaction_poll_ms > 0 && self.progress_poll_ms > 0 && self.account_poll_ms > 0,
            "Poll intervals must be greater than zero"
        );
        ensure!(
            self.username.is_empty() || !self.password.is_empty(),
            "A password is required when a username is set"
        );
        Ok(())
    }

    pub fn poll_intervals(&self) -> PollIntervals {
        PollIntervals {
            interactions: Duration::from_millis(self.interaction_poll_ms),
            progress: Duration::from_millis(self.progress_poll_ms),
            accounts: Duration::from_millis(self.account_poll_ms),
        }
    }

    /// Whether a change to `other` requires a new API session.
    pub fn connection_differs(&self, other: &Settings) -> bool {
        self.server_url != other.server_url
            || self.username != other.username
            || self.password != other.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().expect("default settings should validate");
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"server_url": "http://nas.local:8001"}"#).unwrap();
        assert_eq!(settings.server_url, "http://nas.local:8001");
        assert_eq!(settings.username, "");
        assert_eq!(settings.interaction_poll_ms, 5_000);
        assert_eq!(settings.poll_intervals().progress, Duration::from_secs(1));
    }

    #[test]
    fn rejects_non_http_url() {
        let settings = Settings { server_url: "ftp://example.com".to_string(), ..Default::default() };
        let err = settings.validate().unwrap_err();
        assert!(format!("{err:#}").contains("http:// or https://"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let settings = Settings { progress_poll_ms: 0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_username_without_password() {
        let settings = Settings { username: "admin".to_string(), ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let settings = Settings {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let debug = format!("{settings:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn connection_change_detection() {
        let base = Settings::default();
        let faster = Settings { progress_poll_ms: 250, ..base.clone() };
        assert!(!base.connection_differs(&faster));

        let other_server = Settings { server_url: "http://10.0.0.2:8001".to_string(), ..base.clone() };
        assert!(base.connection_differs(&other_server));
    }
}
