//! Telegram update handlers.
//!
//! Each handler validates input, calls into the core services, and renders
//! the outcome. The outermost boundary here converts any unexpected failure
//! into a generic apology: a single request can never take the process down.

use std::sync::Arc;

use teloxide::{prelude::*, types::CallbackQuery};
use tracing::error;

use crate::router::AppState;

mod callback;
mod commands;
mod prompts;
mod text;

const APOLOGY: &str = "⚠️ Something went wrong. Please try again later.";

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let is_command = msg.text().map(|t| t.starts_with('/')).unwrap_or(false);

    let outcome = if is_command {
        commands::handle_command(&bot, &msg, &state).await
    } else if msg.text().is_some() {
        text::handle_text(&bot, &msg, &state).await
    } else {
        Ok(())
    };

    if let Err(e) = outcome {
        error!("message handler failed: {e:#}");
        let _ = bot.send_message(msg.chat.id, APOLOGY).await;
    }

    Ok(())
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if let Err(e) = callback::handle_callback(&bot, &q, &state).await {
        error!("callback handler failed: {e:#}");
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(APOLOGY.to_string())
            .await;
    }

    Ok(())
}
