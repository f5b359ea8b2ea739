use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use companion_bot::companion::{
    clean_text, CompanionService, ConversationContext, EmitFn, HistoryEntry, OpenAiAgent,
    TelegramDelivery,
};
use companion_bot::config::CompanionConfig;

struct BotState {
    service: CompanionService,
    /// Per-chat conversation history, in memory for the process lifetime.
    histories: Mutex<HashMap<ChatId, Vec<HistoryEntry>>>,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "companion.json".to_string());
    let config = match CompanionConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("companion.log"))
        .expect("Failed to open log file");
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

    info!("🚀 Starting companion \"{}\"", config.name);
    info!("Loaded config from {config_path}");
    if config.whitelist_configured() {
        info!(
            "Whitelist active ({} chat(s)), free-tier limit {} turns",
            config.chat_ids.len(),
            config.free_message_limit
        );
    }
    if config.voice.is_some() {
        info!("Voice synthesis enabled");
    }

    let bot = Bot::new(&config.bot_token);
    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => error!("Failed to get bot info: {e}"),
    }

    let agent = Arc::new(OpenAiAgent::new(&config));
    let state = Arc::new(BotState {
        service: CompanionService::new(config, agent),
        histories: Mutex::new(HashMap::new()),
    });

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    // Transport whitelist: when configured, other chats are ignored entirely
    if !state.service.config().allows_chat(msg.chat.id) {
        return Ok(());
    }

    let preview: String = text.chars().take(50).collect();
    info!("📨 Message in chat {}: \"{}\"", msg.chat.id, preview);

    // Record the user message, then run the turn against a snapshot
    let history = {
        let mut histories = state.histories.lock().await;
        let history = histories.entry(msg.chat.id).or_default();
        history.push(HistoryEntry::user(text));
        history.clone()
    };

    let delivery: Arc<dyn EmitFn> = Arc::new(TelegramDelivery::new(bot, msg.chat.id));
    let ctx = ConversationContext::new(msg.chat.id.0, history, vec![delivery]);

    match state.service.run_turn(&ctx).await {
        Ok(batch) => {
            let mut histories = state.histories.lock().await;
            let history = histories.entry(msg.chat.id).or_default();
            for block in &batch {
                if block.is_text() {
                    let reply = clean_text(block.text_content());
                    if !reply.is_empty() {
                        history.push(HistoryEntry::companion(reply));
                    }
                }
            }
        }
        Err(e) => error!("Turn failed for chat {}: {e}", msg.chat.id),
    }

    Ok(())
}
