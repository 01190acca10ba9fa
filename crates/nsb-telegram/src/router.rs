use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tracing::info;

use nsb_core::{
    broadcast::Broadcaster,
    config::Config,
    domain::ChatId,
    gate::AccessGate,
    lookup::{HttpLookupApi, LookupService},
    store::UserGateway,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub gateway: Arc<UserGateway>,
    pub gate: Arc<AccessGate>,
    pub lookup: Arc<LookupService>,
    pub broadcaster: Arc<Broadcaster>,
}

pub async fn run_polling(cfg: Arc<Config>, gateway: Arc<UserGateway>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("nsb started: @{}", me.username());
    }
    info!(
        "channel: @{} | group: {} | admins: {} | storage: {}",
        cfg.channel_username,
        cfg.group_chat_id,
        cfg.admin_ids.len(),
        if gateway.is_connected() {
            "durable"
        } else {
            "cache-only"
        },
    );

    let messenger = Arc::new(TelegramMessenger::new(bot.clone(), &cfg.channel_username));

    let gate = Arc::new(AccessGate::new(
        gateway.clone(),
        messenger.clone(),
        ChatId(cfg.group_chat_id),
        cfg.request_cooldown,
    ));

    let api = Arc::new(HttpLookupApi::new(
        cfg.lookup_api_url.clone(),
        cfg.http_connect_timeout,
        cfg.http_total_timeout,
    )?);

    let lookup = Arc::new(LookupService::new(gateway.clone(), gate.clone(), api));
    let broadcaster = Arc::new(Broadcaster::new(
        gateway.clone(),
        messenger,
        cfg.broadcast_delay,
    ));

    let state = Arc::new(AppState {
        cfg,
        gateway,
        gate,
        lookup,
        broadcaster,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
