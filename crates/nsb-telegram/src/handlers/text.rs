use teloxide::prelude::*;

use nsb_core::domain::UserId;

use crate::router::AppState;

use super::commands::run_lookup;

pub async fn handle_text(bot: &Bot, msg: &Message, state: &AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text().map(str::trim) else {
        return Ok(());
    };

    let user_id = UserId(user.id.0 as i64);
    let display_name = Some(user.full_name()).filter(|s| !s.is_empty());
    let handle = user.username.clone();

    // A bare number in the designated group is treated as a search term.
    let is_term = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit());
    if is_term && msg.chat.id.0 == state.cfg.group_chat_id {
        return run_lookup(bot, msg, state, user_id, display_name, handle, text).await;
    }

    // Keep the group quiet; only hint in private chats.
    if msg.chat.is_private() {
        bot.send_message(msg.chat.id, "Send /num <number> in the group to search.")
            .await?;
    }

    Ok(())
}
