//! Routes inbound events to handlers based on payload, admin rights and
//! conversation state.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::assistant::admin::{broadcast_summary, stats_report};
use crate::assistant::broadcast;
use crate::assistant::context::AppContext;
use crate::assistant::gate;
use crate::assistant::platform::{MessageRef, Outgoing, PlatformError};
use crate::assistant::state::ConversationState;
use crate::assistant::store::Event as Counter;
use crate::assistant::templates::{Templates, display_name, payload};

const BROADCAST_PROMPT: &str = "Пришлите одно сообщение-шаблон. /cancel — отменить.";
const BROADCAST_STARTED: &str = "Рассылаю…";
const BROADCAST_UNAVAILABLE: &str = "❌ Не удалось получить список получателей.";
const CHANNEL_POST_PROMPT: &str =
    "Пришлите текст, который нужно опубликовать в канале. /cancel — отменить.";
const CHANNEL_POST_DONE: &str = "✅ Ваше сообщение отправлено в канал.";
const CHANNEL_POST_FAILED: &str = "❌ Не удалось отправить сообщение в канал.";
const CHANNEL_POST_EMPTY: &str = "❌ В сообщении нет текста, публиковать нечего.";
const CANCELLED: &str = "Отменено.";

/// Who sent an event.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Inbound {
    /// `text` is the plain text commands are parsed from. `html` is the text
    /// or caption rendered as HTML, keeping the sender's formatting.
    Message {
        chat_id: i64,
        message_id: i32,
        text: Option<String>,
        html: Option<String>,
    },
    /// Inline button press, carrying the button's callback payload.
    Button { chat_id: i64, data: String },
}

#[derive(Debug, Clone)]
pub struct Event {
    pub sender: Sender,
    pub inbound: Inbound,
}

impl Event {
    fn chat_id(&self) -> i64 {
        match self.inbound {
            Inbound::Message { chat_id, .. } | Inbound::Button { chat_id, .. } => chat_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Start,
    Gift,
    DownloadGuide,
    Course,
    Services,
    Stats,
    BeginBroadcast,
    BeginChannelPost,
    Cancel,
    Broadcast(MessageRef),
    ChannelPost(Option<String>),
    Ignore,
}

pub enum Dispatched {
    Ignored,
    Handled,
    /// A broadcast is running in this task; it reports to the admin when done.
    Spawned(JoinHandle<()>),
}

/// `/cmd`, `/cmd@botname` or `/cmd args` → `cmd`, lowercased.
fn command(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = token.split('@').next().unwrap_or(token);
    Some(name.to_lowercase())
}

/// Decide what to do with an event. Awaited admin input takes precedence over
/// command text; only `/cancel` escapes it. Button presses ignore state.
pub fn route(state: ConversationState, is_admin: bool, inbound: &Inbound) -> Route {
    let (chat_id, message_id, text, html) = match inbound {
        Inbound::Button { data, .. } => {
            return match data.as_str() {
                payload::GIFT | payload::CHECK_SUB => Route::Gift,
                payload::DOWNLOAD_GUIDE => Route::DownloadGuide,
                payload::COURSE => Route::Course,
                payload::SERVICES => Route::Services,
                _ => Route::Ignore,
            };
        }
        Inbound::Message { chat_id, message_id, text, html } => {
            (*chat_id, *message_id, text.as_deref(), html.as_deref())
        }
    };

    let command = text.and_then(command);
    if command.as_deref() == Some("cancel") {
        return Route::Cancel;
    }

    match state {
        ConversationState::AwaitingBroadcastTemplate => {
            return Route::Broadcast(MessageRef { chat_id, message_id });
        }
        ConversationState::AwaitingChannelPostText => {
            return Route::ChannelPost(html.map(str::to_string));
        }
        ConversationState::Idle => {}
    }

    let Some(command) = command else {
        return Route::Ignore;
    };
    match command.as_str() {
        "start" => Route::Start,
        "gift" => Route::Gift,
        "course" => Route::Course,
        "services" => Route::Services,
        "stats" if is_admin => Route::Stats,
        c if c.starts_with("announce") && is_admin => Route::BeginBroadcast,
        "chanel_massage" if is_admin => Route::BeginChannelPost,
        _ => Route::Ignore,
    }
}

/// Handle one inbound event end to end.
pub async fn handle(ctx: &Arc<AppContext>, event: Event) -> Dispatched {
    let state = ctx.conversations.get(event.sender.id).await;
    let is_admin = ctx.admins.contains(event.sender.id);
    let route = route(state, is_admin, &event.inbound);

    if route == Route::Ignore {
        return Dispatched::Ignored;
    }
    info!("{:?} from {} ({})", route, event.sender.first_name, event.sender.id);

    match execute(ctx, &event, route).await {
        Ok(dispatched) => dispatched,
        Err(e) => {
            warn!("Handler failed for {}: {e}", event.sender.id);
            Dispatched::Handled
        }
    }
}

async fn execute(
    ctx: &Arc<AppContext>,
    event: &Event,
    route: Route,
) -> Result<Dispatched, PlatformError> {
    let chat_id = event.chat_id();
    let sender = &event.sender;

    match route {
        Route::Start => {
            match ctx.store.add_recipient(sender.id) {
                Ok(true) => info!("👋 New recipient {}", sender.id),
                Ok(false) => {}
                Err(e) => warn!("Failed to store recipient {}: {e}", sender.id),
            }
            ctx.count(Counter::Start);
            let name = display_name(&sender.first_name, sender.username.as_deref());
            ctx.reply(chat_id, &ctx.templates.welcome(&name)).await?;
        }
        Route::Gift => gift_flow(ctx, chat_id, sender).await?,
        Route::DownloadGuide => {
            ctx.count(Counter::GuideDownloaded);
            ctx.reply(chat_id, &ctx.templates.guide_link()).await?;
        }
        Route::Course => {
            ctx.count(Counter::CourseClicked);
            ctx.reply(chat_id, &ctx.templates.course()).await?;
        }
        Route::Services => {
            ctx.count(Counter::ServicesClicked);
            ctx.reply(chat_id, &ctx.templates.services()).await?;
        }
        Route::Stats => {
            let report = match ctx.store.counters() {
                Ok(counters) => stats_report(&counters),
                Err(e) => {
                    warn!("Failed to read counters: {e}");
                    stats_report(&[])
                }
            };
            ctx.reply(chat_id, &Outgoing::text(report)).await?;
        }
        // Only wait for input once the admin has seen the prompt
        Route::BeginBroadcast => {
            ctx.reply(chat_id, &Outgoing::text(BROADCAST_PROMPT)).await?;
            ctx.conversations.set(sender.id, ConversationState::AwaitingBroadcastTemplate).await;
        }
        Route::BeginChannelPost => {
            ctx.reply(chat_id, &Outgoing::text(CHANNEL_POST_PROMPT)).await?;
            ctx.conversations.set(sender.id, ConversationState::AwaitingChannelPostText).await;
        }
        Route::Cancel => {
            if ctx.conversations.take(sender.id).await != ConversationState::Idle {
                ctx.reply(chat_id, &Outgoing::text(CANCELLED)).await?;
            }
        }
        Route::Broadcast(source) => {
            ctx.conversations.take(sender.id).await;
            return start_broadcast(ctx, chat_id, source).await;
        }
        Route::ChannelPost(text) => {
            ctx.conversations.take(sender.id).await;
            publish_channel_post(ctx, chat_id, text).await?;
        }
        Route::Ignore => return Ok(Dispatched::Ignored),
    }
    Ok(Dispatched::Handled)
}

/// Shared by `/gift` and the `gift` / `check_sub` buttons.
async fn gift_flow(ctx: &AppContext, chat_id: i64, sender: &Sender) -> Result<(), PlatformError> {
    ctx.count(Counter::GiftClicked);

    if gate::is_member(ctx.platform.as_ref(), ctx.channel_id, sender.id).await {
        ctx.count(Counter::GiftSent);
        let name = display_name(&sender.first_name, sender.username.as_deref());
        info!("🎁 Sending gift to {}", sender.id);
        ctx.reply(chat_id, &ctx.templates.gift(&name)).await
    } else {
        ctx.reply(chat_id, &ctx.templates.subscribe_prompt()).await
    }
}

async fn start_broadcast(
    ctx: &Arc<AppContext>,
    admin_chat: i64,
    source: MessageRef,
) -> Result<Dispatched, PlatformError> {
    let recipients = match ctx.store.recipients() {
        Ok(recipients) => recipients,
        Err(e) => {
            warn!("Failed to list recipients: {e}");
            ctx.reply(admin_chat, &Outgoing::text(BROADCAST_UNAVAILABLE)).await?;
            return Ok(Dispatched::Handled);
        }
    };
    // The template is already consumed; the run goes ahead even if this reply fails
    if let Err(e) = ctx.reply(admin_chat, &Outgoing::text(BROADCAST_STARTED)).await {
        warn!("Failed to acknowledge broadcast: {e}");
    }

    let ctx = Arc::clone(ctx);
    let handle = tokio::spawn(async move {
        let report =
            broadcast::run(ctx.platform.as_ref(), source, &recipients, ctx.broadcast_delay).await;
        let summary = Outgoing::text(broadcast_summary(report.delivered, report.failed));
        if let Err(e) = ctx.reply(admin_chat, &summary).await {
            warn!("Failed to report broadcast result: {e}");
        }
    });
    Ok(Dispatched::Spawned(handle))
}

async fn publish_channel_post(
    ctx: &AppContext,
    admin_chat: i64,
    text: Option<String>,
) -> Result<(), PlatformError> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return ctx.reply(admin_chat, &Outgoing::text(CHANNEL_POST_EMPTY)).await;
    };

    let post = Templates::channel_post(&text, ctx.bot_link.clone());
    match ctx.platform.send(ctx.channel_id, &post).await {
        Ok(_) => {
            info!("📢 Published channel post to {}", ctx.channel_id);
            ctx.reply(admin_chat, &Outgoing::text(CHANNEL_POST_DONE)).await
        }
        Err(e) => {
            warn!("Channel post failed: {e}");
            ctx.reply(admin_chat, &Outgoing::text(CHANNEL_POST_FAILED)).await
        }
    }
}
