use std::time::Duration;

use teloxide::{prelude::*, types::ParseMode};

use nsb_core::{
    domain::{ChatId, UserId},
    gate::{Denial, Standing},
    lookup::SearchReply,
};

use crate::render::{clamp, escape_html, render_records, SAFE_MESSAGE_LIMIT};
use crate::router::AppState;

use super::prompts;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

pub async fn handle_command(bot: &Bot, msg: &Message, state: &AppState) -> anyhow::Result<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let (cmd, arg) = parse_command(text);
    let user_id = UserId(user.id.0 as i64);
    let display_name = Some(user.full_name()).filter(|s| !s.is_empty());
    let handle = user.username.clone();

    match cmd.as_str() {
        "start" | "help" => {
            let record = state.gate.ensure_user(user_id, display_name, handle).await;

            match Standing::of(&record) {
                Standing::Banned => {
                    bot.send_message(msg.chat.id, "🚫 Access denied.").await?;
                }
                Standing::AwaitingTerms => {
                    let (text, keyboard) = prompts::terms_prompt();
                    bot.send_message(msg.chat.id, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboard)
                        .await?;
                }
                Standing::AwaitingChannel => {
                    let (text, keyboard) = prompts::join_prompt(&state.cfg);
                    bot.send_message(msg.chat.id, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboard)
                        .await?;
                }
                Standing::Eligible => {
                    bot.send_message(msg.chat.id, prompts::eligible_text(&state.cfg))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
            }
            Ok(())
        }

        "num" => run_lookup(bot, msg, state, user_id, display_name, handle, &arg).await,

        "stats" => {
            if !require_admin(bot, msg, state, user_id).await? {
                return Ok(());
            }

            let stats = state.gateway.stats().await;
            let storage = if state.gateway.is_connected() {
                "durable"
            } else {
                "cache-only"
            };
            let body = format!(
                "📊 <b>Bot statistics</b>\n\n\
Users: <b>{}</b>\n\
Accepted terms: <b>{}</b>\n\
Total searches: <b>{}</b>\n\
Storage: <b>{storage}</b>",
                stats.total_users, stats.accepted_users, stats.total_searches,
            );
            bot.send_message(msg.chat.id, body)
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(())
        }

        "broadcast" => {
            if !require_admin(bot, msg, state, user_id).await? {
                return Ok(());
            }
            if arg.is_empty() {
                bot.send_message(msg.chat.id, "Usage: /broadcast <message>")
                    .await?;
                return Ok(());
            }

            let outcome = state
                .broadcaster
                .broadcast(&format!("📣 {}", escape_html(&arg)))
                .await;
            bot.send_message(
                msg.chat.id,
                format!(
                    "Broadcast complete: {} delivered, {} failed.",
                    outcome.succeeded, outcome.failed
                ),
            )
            .await?;
            Ok(())
        }

        "ban" => run_ban(bot, msg, state, user_id, &arg, true).await,
        "unban" => run_ban(bot, msg, state, user_id, &arg, false).await,

        _ => {
            // Group chats see commands meant for other bots; only answer
            // in private.
            if msg.chat.is_private() {
                bot.send_message(
                    msg.chat.id,
                    format!("Unknown command: /{}", escape_html(&cmd)),
                )
                .await?;
            }
            Ok(())
        }
    }
}

/// Shared by `/num` and plain numeric group messages.
pub async fn run_lookup(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: UserId,
    display_name: Option<String>,
    handle: Option<String>,
    term: &str,
) -> anyhow::Result<()> {
    let chat = ChatId(msg.chat.id.0);
    let reply = state
        .lookup
        .search(user_id, display_name, handle, chat, term)
        .await;

    match reply {
        SearchReply::InvalidTerm => {
            bot.send_message(msg.chat.id, "Usage: /num <number> (digits only)")
                .await?;
        }
        SearchReply::Denied(Denial::Banned) => {
            bot.send_message(msg.chat.id, "🚫 Access denied.").await?;
        }
        SearchReply::Denied(Denial::TermsRequired) => {
            let (text, keyboard) = prompts::terms_prompt();
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        SearchReply::Denied(Denial::ChannelRequired) => {
            let (text, keyboard) = prompts::join_prompt(&state.cfg);
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
        SearchReply::Denied(Denial::WrongContext) => {
            let group_hint = state
                .cfg
                .group_link
                .as_deref()
                .map(|link| format!("\n{link}"))
                .unwrap_or_default();
            bot.send_message(
                msg.chat.id,
                format!("Search only works in the group.{group_hint}"),
            )
            .await?;
        }
        SearchReply::Denied(Denial::Cooldown(remaining)) => {
            bot.send_message(
                msg.chat.id,
                format!("⏳ Please wait {}s before searching again.", ceil_secs(remaining)),
            )
            .await?;
        }
        SearchReply::Found(records) => {
            let html = clamp(&render_records(term.trim(), &records), SAFE_MESSAGE_LIMIT);
            bot.send_message(msg.chat.id, html)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        SearchReply::UpstreamDown => {
            bot.send_message(
                msg.chat.id,
                "The lookup service is not responding. Please try again later.",
            )
            .await?;
        }
        SearchReply::Unrecognized => {
            bot.send_message(msg.chat.id, "❌ No usable result for this number.")
                .await?;
        }
    }

    Ok(())
}

async fn run_ban(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    admin: UserId,
    arg: &str,
    ban: bool,
) -> anyhow::Result<()> {
    if !require_admin(bot, msg, state, admin).await? {
        return Ok(());
    }

    let verb = if ban { "ban" } else { "unban" };
    let Ok(target) = arg.trim().parse::<i64>() else {
        bot.send_message(msg.chat.id, format!("Usage: /{verb} <user id>"))
            .await?;
        return Ok(());
    };

    let updated = if ban {
        state.gate.ban(UserId(target)).await
    } else {
        state.gate.unban(UserId(target)).await
    };

    match updated {
        Some(record) => {
            let standing = match Standing::of(&record) {
                Standing::Banned => "banned",
                Standing::AwaitingTerms => "awaiting terms",
                Standing::AwaitingChannel => "awaiting channel",
                Standing::Eligible => "eligible",
            };
            bot.send_message(
                msg.chat.id,
                format!("User {target} is now {standing}."),
            )
            .await?;
        }
        None => {
            bot.send_message(msg.chat.id, format!("No record for user {target}."))
                .await?;
        }
    }

    Ok(())
}

async fn require_admin(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: UserId,
) -> anyhow::Result<bool> {
    if state.cfg.is_admin(user_id.0) {
        return Ok(true);
    }
    bot.send_message(msg.chat.id, "This command is restricted.")
        .await?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix_and_args() {
        assert_eq!(
            parse_command("/num@nsb_bot 9876543210"),
            ("num".to_string(), "9876543210".to_string())
        );
        assert_eq!(parse_command("/START"), ("start".to_string(), String::new()));
        assert_eq!(
            parse_command("/broadcast hello  world"),
            ("broadcast".to_string(), "hello  world".to_string())
        );
    }

    #[test]
    fn cooldown_seconds_round_up() {
        assert_eq!(ceil_secs(Duration::from_secs(3)), 3);
        assert_eq!(ceil_secs(Duration::from_millis(3_200)), 4);
        assert_eq!(ceil_secs(Duration::ZERO), 0);
    }
}
