//! Narrow messaging-platform contract the assistant depends on.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("telegram request failed: {0}")]
    Request(String),
}

/// Result of copying one message to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Delivered(i64),
    /// Flood control: the platform asks us to wait before the next call.
    RateLimited(Duration),
    /// The recipient blocked the bot or can no longer be messaged.
    Forbidden,
    Failed(String),
}

/// Membership of a user in a chat, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

/// A message already sent somewhere, addressable for copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ButtonAction {
    Callback(String),
    Url(Url),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(label: &str, data: &str) -> Self {
        Self { label: label.to_string(), action: ButtonAction::Callback(data.to_string()) }
    }

    pub fn url(label: &str, url: Url) -> Self {
        Self { label: label.to_string(), action: ButtonAction::Url(url) }
    }
}

/// Inline keyboard, one button per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn column(buttons: Vec<Button>) -> Self {
        Self { rows: buttons.into_iter().map(|b| vec![b]).collect() }
    }

    /// Callback payloads of every button, in display order.
    #[cfg(test)]
    pub fn callbacks(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(data) => Some(data.as_str()),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }

    #[cfg(test)]
    pub fn urls(&self) -> Vec<&Url> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Url(url) => Some(url),
                ButtonAction::Callback(_) => None,
            })
            .collect()
    }
}

/// An outbound message: HTML text, sent as a photo caption when an image is set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outgoing {
    pub text: String,
    pub image: Option<PathBuf>,
    pub keyboard: Option<Keyboard>,
    pub link_preview: bool,
}

impl Outgoing {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), link_preview: true, ..Default::default() }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_image(mut self, image: Option<PathBuf>) -> Self {
        self.image = image;
        self
    }

    pub fn without_link_preview(mut self) -> Self {
        self.link_preview = false;
        self
    }
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Send a message and return its id.
    async fn send(&self, chat_id: i64, message: &Outgoing) -> Result<i64, PlatformError>;

    async fn member_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, PlatformError>;

    /// Copy an existing message verbatim (text, media, formatting) to another chat.
    async fn copy_message(&self, to_chat_id: i64, source: MessageRef) -> SendOutcome;

    async fn bot_username(&self) -> Result<String, PlatformError>;

    /// Replace the command menu with `(command, description)` pairs.
    async fn set_commands(&self, commands: &[(&str, &str)]) -> Result<(), PlatformError>;

    /// Discard updates queued while the bot was offline.
    async fn drop_pending_updates(&self) -> Result<(), PlatformError>;
}
