use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use teloxide::types::{ChatId, UserId};
use thiserror::Error;
use url::Url;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    /// A variable is present but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub struct Config {
    pub telegram_bot_token: String,
    /// Channel whose membership gates the gift and which receives channel posts.
    pub channel_id: ChatId,
    /// Administrator allow-list. Never empty.
    pub admin_ids: HashSet<UserId>,
    /// Where the "download guide" message points.
    pub gift_url: Url,
    /// Target of the "subscribe" button.
    pub channel_invite_url: Url,
    pub image_dir: PathBuf,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub health_port: u16,
    /// Pause after every successful broadcast delivery.
    pub broadcast_delay: Duration,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let telegram_bot_token = require("BOT_TOKEN")?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        match telegram_bot_token.split_once(':') {
            Some((id, secret)) if id.parse::<u64>().is_ok() && !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    name: "BOT_TOKEN",
                    reason: "expected format 123456789:ABCdefGHI...".into(),
                });
            }
        }

        let channel_id = require("CHANNEL_ID")?
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| ConfigError::Invalid { name: "CHANNEL_ID", reason: e.to_string() })?;

        let admin_ids = parse_admin_ids(&require("ADMIN_IDS")?)?;
        let gift_url = parse_url("GIFT_URL", &require("GIFT_URL")?)?;
        let channel_invite_url = parse_url("CHANNEL_INVITE_URL", &require("CHANNEL_INVITE_URL")?)?;

        let image_dir = get("IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("images"));
        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let health_port = match get("HEALTH_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { name: "HEALTH_PORT", reason: e.to_string() })?,
            None => 8000,
        };
        let broadcast_delay_ms = match get("BROADCAST_DELAY_MS") {
            Some(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "BROADCAST_DELAY_MS",
                reason: e.to_string(),
            })?,
            None => 50,
        };

        Ok(Self {
            telegram_bot_token,
            channel_id,
            admin_ids,
            gift_url,
            channel_invite_url,
            image_dir,
            data_dir,
            health_port,
            broadcast_delay: Duration::from_millis(broadcast_delay_ms),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bot.db")
    }
}

fn parse_admin_ids(raw: &str) -> Result<HashSet<UserId>, ConfigError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map(UserId).map_err(|_| ConfigError::Invalid {
                name: "ADMIN_IDS",
                reason: format!("'{s}' is not a user id"),
            })
        })
        .collect::<Result<HashSet<_>, _>>()?;

    if ids.is_empty() {
        return Err(ConfigError::Invalid {
            name: "ADMIN_IDS",
            reason: "must contain at least one user id".into(),
        });
    }
    Ok(ids)
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid { name, reason: e.to_string() })
}
