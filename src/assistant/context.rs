//! Everything a handler needs, built once at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::assistant::admin::Admins;
use crate::assistant::platform::{Outgoing, Platform, PlatformError};
use crate::assistant::state::Conversations;
use crate::assistant::store::{Event, Store};
use crate::assistant::templates::Templates;

/// Public command menu. Admin commands are deliberately absent.
pub const COMMANDS: &[(&str, &str)] = &[
    ("start", "Запустить бота и показать главное меню"),
    ("gift", "Получить подарок-гайд"),
    ("course", "Узнать о мини-курсе"),
    ("services", "Узнать об услугах"),
];

pub struct AppContext {
    pub platform: Arc<dyn Platform>,
    pub store: Store,
    pub conversations: Conversations,
    pub templates: Templates,
    pub admins: Admins,
    pub channel_id: i64,
    /// `https://t.me/<bot username>`, used by channel posts.
    pub bot_link: Url,
    pub broadcast_delay: Duration,
}

impl AppContext {
    /// Bump a counter. Failures are logged; the user still gets a reply.
    pub fn count(&self, event: Event) {
        if let Err(e) = self.store.increment_event(event.as_str()) {
            warn!("Failed to count {}: {e}", event.as_str());
        }
    }

    pub async fn reply(&self, chat_id: i64, message: &Outgoing) -> Result<(), PlatformError> {
        self.platform.send(chat_id, message).await.map(|_| ())
    }
}

pub fn bot_link(username: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("https://t.me/{username}"))
}

/// Drop updates queued while offline, publish the command menu and resolve
/// the bot's username.
pub async fn prepare(platform: &dyn Platform) -> Result<String, PlatformError> {
    platform.drop_pending_updates().await?;
    platform.set_commands(COMMANDS).await?;
    let username = platform.bot_username().await?;
    info!("Bot username: @{}", username);
    Ok(username)
}
