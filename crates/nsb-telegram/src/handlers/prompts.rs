//! Onboarding prompt texts + keyboards shared by commands and callbacks.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use nsb_core::config::Config;

use crate::render::escape_html;

pub const CB_ACCEPT_TERMS: &str = "terms:accept";
pub const CB_RECHECK_CHANNEL: &str = "channel:recheck";

pub fn terms_prompt() -> (String, InlineKeyboardMarkup) {
    let text = "👋 <b>Welcome!</b>\n\n\
Before you can search, please accept the terms of use:\n\
• Results come from third-party public sources and may be wrong or stale.\n\
• You are responsible for how you use them.\n\
• Abuse gets you banned."
        .to_string();

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "✅ Accept terms",
        CB_ACCEPT_TERMS,
    )]]);

    (text, keyboard)
}

pub fn join_prompt(cfg: &Config) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "📢 To use the bot you must be a member of our channel:\n\
@{}\n{}\n\nJoin, then tap the button below.",
        escape_html(&cfg.channel_username),
        escape_html(&cfg.channel_link),
    );

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔄 I've joined",
        CB_RECHECK_CHANNEL,
    )]]);

    (text, keyboard)
}

pub fn eligible_text(cfg: &Config) -> String {
    let group_line = cfg
        .group_link
        .as_deref()
        .map(|link| format!("\nGroup: {}", escape_html(link)))
        .unwrap_or_default();

    format!(
        "✅ <b>You're all set.</b>\n\n\
Search with <code>/num &lt;number&gt;</code> in the group.{group_line}"
    )
}
