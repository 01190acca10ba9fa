use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

/// Outbound messaging capability consumed by the core (broadcast fan-out).
///
/// Telegram is the first implementation; the shape is small on purpose so
/// other transports can fit behind it.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()>;
}

/// Live membership probe against the required broadcast channel.
///
/// The probe is consulted on every gated action; callers treat a transport
/// error the same as "not a member" for that request.
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    async fn is_member(&self, user_id: UserId) -> Result<bool>;
}

/// Raw upstream lookup fetch. The response body is free-form text; the
/// normalizer deals with whatever comes back.
#[async_trait]
pub trait LookupApi: Send + Sync {
    async fn fetch_raw(&self, term: &str) -> Result<String>;
}
