// Configuration management with layered configuration (file, env)
//
// One immutable Settings value is built at process start and passed into
// each component; there is no process-wide mutable state.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub conference: ConferenceConfig,
    pub folders: FolderConfig,
    pub webhook: WebhookConfig,
    pub broker: BrokerConfig,
    pub announcer: AnnouncerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConferenceConfig {
    /// All talk timestamps are normalized to this zone before comparison
    pub timezone: chrono_tz::Tz,
    /// Prefix for permalinks in announcement messages
    pub site_base_url: String,
    /// Chat channel referenced from the announcement templates
    pub discussion_channel_id: String,
}

impl Default for ConferenceConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            site_base_url: "https://conference.example.com".to_string(),
            discussion_channel_id: "000000000000000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    pub drafts: PathBuf,
    pub inbox: PathBuf,
    pub outbox: PathBuf,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            drafts: PathBuf::from("_drafts"),
            inbox: PathBuf::from("_inbox"),
            outbox: PathBuf::from("_outbox"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Destination webhook; absent means dry-run mode
    pub url: Option<String>,
    pub timeout_seconds: u64,
    /// Retry ceiling for queue-context delivery
    pub max_retries: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_seconds: 10,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Redis connection string; its mere presence switches the dispatcher
    /// from synchronous posting to delayed-task scheduling
    pub url: Option<String>,
    /// Sorted-set key holding pending deliveries
    pub queue_key: String,
    pub poll_interval_seconds: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: None,
            queue_key: "announcer:deliveries".to_string(),
            poll_interval_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub talks_path: PathBuf,
    /// Categories that never produce an announcement
    pub ignored_categories: Vec<String>,
    /// Inter-talk pause in synchronous and post-now modes
    pub pause_seconds: u64,
    /// Tera glob for the drafts templates
    pub templates_glob: String,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            talks_path: PathBuf::from("_schedule/talks"),
            ignored_categories: vec![
                "break".to_string(),
                "lunch".to_string(),
                "social-hour".to_string(),
            ],
            pause_seconds: 30,
            templates_glob: "templates/**/*.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("ANNOUNCER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.webhook.timeout_seconds == 0 {
            return Err("Webhook timeout_seconds must be greater than 0".to_string());
        }
        if self.webhook.max_retries == 0 {
            return Err("Webhook max_retries must be at least 1".to_string());
        }
        if let Some(url) = &self.webhook.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("Webhook URL '{}' is not an HTTP URL", url));
            }
        }
        if let Some(url) = &self.broker.url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(format!("Broker URL '{}' is not a Redis URL", url));
            }
        }
        if self.broker.poll_interval_seconds == 0 {
            return Err("Broker poll_interval_seconds must be greater than 0".to_string());
        }
        if self.broker.queue_key.is_empty() {
            return Err("Broker queue_key cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.conference.timezone, chrono_tz::America::Chicago);
        assert_eq!(settings.folders.drafts, PathBuf::from("_drafts"));
        assert_eq!(settings.folders.inbox, PathBuf::from("_inbox"));
        assert_eq!(settings.folders.outbox, PathBuf::from("_outbox"));
        assert!(settings.webhook.url.is_none());
        assert!(settings.broker.url.is_none());
        assert_eq!(settings.webhook.max_retries, 5);
        assert_eq!(
            settings.announcer.ignored_categories,
            vec!["break", "lunch", "social-hour"]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let settings = Settings::load_from_path("/nonexistent-config-dir").unwrap();
        assert_eq!(settings.announcer.pause_seconds, 30);
    }

    #[test]
    fn test_validate_rejects_bad_webhook_url() {
        let mut settings = Settings::default();
        settings.webhook.url = Some("ftp://example.com/hook".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_broker_url() {
        let mut settings = Settings::default();
        settings.broker.url = Some("amqp://localhost".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut settings = Settings::default();
        settings.webhook.timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }
}
