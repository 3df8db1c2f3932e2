//! Telegram implementation of the platform port, using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, ChatMemberKind, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
    LinkPreviewOptions, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use tracing::{info, warn};

use crate::assistant::platform::{
    ButtonAction, Keyboard, MemberStatus, MessageRef, Outgoing, Platform, PlatformError,
    SendOutcome,
};

/// Telegram API client.
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows = keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| match &button.action {
                ButtonAction::Callback(data) => {
                    InlineKeyboardButton::callback(button.label.clone(), data.clone())
                }
                ButtonAction::Url(url) => {
                    InlineKeyboardButton::url(button.label.clone(), url.clone())
                }
            })
            .collect::<Vec<_>>()
    });
    InlineKeyboardMarkup::new(rows)
}

fn disabled_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn request_error(context: &str, e: RequestError) -> PlatformError {
    let msg = format!("{context}: {e}");
    warn!("{}", msg);
    PlatformError::Request(msg)
}

/// Map a failed delivery onto the outcome the broadcast loop switches on.
pub fn classify_send_error(e: RequestError) -> SendOutcome {
    match e {
        RequestError::RetryAfter(wait) => SendOutcome::RateLimited(wait.duration()),
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation,
        ) => SendOutcome::Forbidden,
        other => SendOutcome::Failed(other.to_string()),
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn send(&self, chat_id: i64, message: &Outgoing) -> Result<i64, PlatformError> {
        let chat_id = ChatId(chat_id);

        let sent = match &message.image {
            Some(path) => {
                let mut request = self
                    .bot
                    .send_photo(chat_id, InputFile::file(path.clone()))
                    .caption(message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(keyboard) = &message.keyboard {
                    request = request.reply_markup(markup(keyboard));
                }
                request.await
            }
            None => {
                let mut request = self
                    .bot
                    .send_message(chat_id, message.text.clone())
                    .parse_mode(ParseMode::Html);
                if let Some(keyboard) = &message.keyboard {
                    request = request.reply_markup(markup(keyboard));
                }
                if !message.link_preview {
                    request = request.link_preview_options(disabled_preview());
                }
                request.await
            }
        };

        sent.map(|msg| msg.id.0 as i64)
            .map_err(|e| request_error("Failed to send", e))
    }

    async fn member_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, PlatformError> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map_err(|e| request_error("Failed to get chat member", e))?;

        Ok(match member.kind {
            ChatMemberKind::Owner(_) => MemberStatus::Creator,
            ChatMemberKind::Administrator(_) => MemberStatus::Administrator,
            ChatMemberKind::Member(_) => MemberStatus::Member,
            ChatMemberKind::Restricted(_) => MemberStatus::Restricted,
            ChatMemberKind::Left => MemberStatus::Left,
            ChatMemberKind::Banned(_) => MemberStatus::Kicked,
        })
    }

    async fn copy_message(&self, to_chat_id: i64, source: MessageRef) -> SendOutcome {
        match self
            .bot
            .copy_message(ChatId(to_chat_id), ChatId(source.chat_id), MessageId(source.message_id))
            .await
        {
            Ok(id) => SendOutcome::Delivered(id.0 as i64),
            Err(e) => classify_send_error(e),
        }
    }

    async fn bot_username(&self) -> Result<String, PlatformError> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| request_error("Failed to get bot info", e))?;
        Ok(me.username().to_string())
    }

    async fn set_commands(&self, commands: &[(&str, &str)]) -> Result<(), PlatformError> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|(command, description)| BotCommand::new(*command, *description))
            .collect();
        info!("Registering {} bot commands", commands.len());

        self.bot
            .set_my_commands(commands)
            .await
            .map_err(|e| request_error("Failed to set commands", e))?;
        Ok(())
    }

    async fn drop_pending_updates(&self) -> Result<(), PlatformError> {
        self.bot
            .delete_webhook()
            .drop_pending_updates(true)
            .await
            .map_err(|e| request_error("Failed to drop pending updates", e))?;
        Ok(())
    }
}
