mod assistant;
mod config;
mod health;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::User;
use teloxide::utils::html;
use teloxide::utils::render::RenderMessageTextHelper;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use assistant::admin::Admins;
use assistant::context::{self, bot_link};
use assistant::platform::Platform;
use assistant::router;
use assistant::state::Conversations;
use assistant::store::Store;
use assistant::templates::Templates;
use assistant::{AppContext, Event, Inbound, Sender, TelegramPlatform};
use config::Config;

fn fatal(message: String) -> ! {
    error!("{message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("giftbot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting giftbot...");
    info!("Admin IDs: {:?}", config.admin_ids);
    info!("Channel: {}", config.channel_id);

    let bot = Bot::new(&config.telegram_bot_token);
    let platform: Arc<dyn Platform> = Arc::new(TelegramPlatform::new(bot.clone()));

    let username = context::prepare(platform.as_ref())
        .await
        .unwrap_or_else(|e| fatal(format!("Startup calls failed: {e}")));
    let bot_link = bot_link(&username)
        .unwrap_or_else(|e| fatal(format!("Invalid bot username @{username}: {e}")));
    let store = Store::open(&config.database_path())
        .unwrap_or_else(|e| fatal(format!("Failed to open database: {e}")));

    tokio::spawn(health::serve(config.health_port));

    let ctx = Arc::new(AppContext {
        platform,
        store,
        conversations: Conversations::new(),
        templates: Templates::new(
            config.image_dir.clone(),
            config.gift_url.clone(),
            config.channel_invite_url.clone(),
        ),
        admins: Admins::new(config.admin_ids.clone()),
        channel_id: config.channel_id.0,
        bot_link,
        broadcast_delay: config.broadcast_delay,
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Stopped");
}

fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        username: user.username.clone(),
    }
}

/// Text or caption as HTML with the sender's formatting preserved.
fn formatted_text(msg: &Message) -> Option<String> {
    msg.html_text()
        .or_else(|| msg.html_caption())
        .or_else(|| msg.text().or(msg.caption()).map(html::escape))
}

async fn handle_message(msg: Message, ctx: Arc<AppContext>) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };

    let event = Event {
        sender: sender(user),
        inbound: Inbound::Message {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            text: msg.text().map(str::to_string),
            html: formatted_text(&msg),
        },
    };
    router::handle(&ctx, event).await;
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, ctx: Arc<AppContext>) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    // Buttons live in the private chat with the user unless the message is gone
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id.0)
        .unwrap_or(q.from.id.0 as i64);

    let event = Event {
        sender: sender(&q.from),
        inbound: Inbound::Button { chat_id, data },
    };
    router::handle(&ctx, event).await;
    Ok(())
}
