use teloxide::{prelude::*, types::ParseMode};

use nsb_core::domain::UserId;

use crate::router::AppState;

use super::prompts;

pub async fn handle_callback(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
) -> anyhow::Result<()> {
    let data = q.data.as_deref().unwrap_or_default();
    let chat = q.message.as_ref().map(|m| (m.chat.id, m.id));

    // Always answer the callback so the client spinner stops.
    if data.is_empty() || chat.is_none() {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }
    let (chat_id, message_id) = chat.unwrap();

    let user = &q.from;
    let user_id = UserId(user.id.0 as i64);
    let display_name = Some(user.full_name()).filter(|s| !s.is_empty());
    let handle = user.username.clone();

    match data {
        prompts::CB_ACCEPT_TERMS => {
            state
                .gate
                .ensure_user(user_id, display_name, handle)
                .await;
            state.gate.accept_terms(user_id).await;

            bot.answer_callback_query(q.id.clone())
                .text("Terms accepted ✅".to_string())
                .await?;
            let _ = bot
                .edit_message_text(chat_id, message_id, "✅ Terms accepted.")
                .await;

            // Next onboarding stage.
            let (text, keyboard) = prompts::join_prompt(&state.cfg);
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }

        prompts::CB_RECHECK_CHANNEL => {
            state
                .gate
                .ensure_user(user_id, display_name, handle)
                .await;

            if state.gate.recheck_channel(user_id).await {
                bot.answer_callback_query(q.id.clone())
                    .text("Membership verified ✅".to_string())
                    .await?;
                let _ = bot
                    .edit_message_text(chat_id, message_id, "✅ Channel membership verified.")
                    .await;
                bot.send_message(chat_id, prompts::eligible_text(&state.cfg))
                    .parse_mode(ParseMode::Html)
                    .await?;
            } else {
                bot.answer_callback_query(q.id.clone())
                    .text("You haven't joined the channel yet.".to_string())
                    .show_alert(true)
                    .await?;
            }
        }

        _ => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
    }

    Ok(())
}
