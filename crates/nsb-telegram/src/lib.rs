//! Telegram adapter (teloxide).
//!
//! This crate implements the `nsb-core` messaging and membership ports over
//! the Telegram Bot API.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ChatMemberKind, ParseMode, Recipient},
};

use tokio::time::sleep;

pub mod handlers;
pub mod render;
pub mod router;

use nsb_core::{
    domain::{ChatId, UserId},
    errors::Error,
    ports::{MembershipProbe, Messenger},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    channel: Recipient,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, channel_username: &str) -> Self {
        let channel = Recipient::ChannelUsername(format!(
            "@{}",
            channel_username.trim_start_matches('@')
        ));
        Self { bot, channel }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MembershipProbe for TelegramMessenger {
    async fn is_member(&self, user_id: UserId) -> Result<bool> {
        let member = self
            .with_retry(|| {
                self.bot.get_chat_member(
                    self.channel.clone(),
                    teloxide::types::UserId(user_id.0 as u64),
                )
            })
            .await?;

        Ok(match member.kind {
            ChatMemberKind::Owner(_)
            | ChatMemberKind::Administrator(_)
            | ChatMemberKind::Member => true,
            ChatMemberKind::Restricted(restricted) => restricted.is_member,
            ChatMemberKind::Left | ChatMemberKind::Banned(_) => false,
        })
    }
}
