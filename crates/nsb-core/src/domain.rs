use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Last tracked action on a user record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Start,
    TermsAccepted,
    ChannelVerified,
    Search,
    Banned,
    Unbanned,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Start => "start",
            ActivityKind::TermsAccepted => "terms_accepted",
            ActivityKind::ChannelVerified => "channel_verified",
            ActivityKind::Search => "search",
            ActivityKind::Banned => "banned",
            ActivityKind::Unbanned => "unbanned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(ActivityKind::Start),
            "terms_accepted" => Some(ActivityKind::TermsAccepted),
            "channel_verified" => Some(ActivityKind::ChannelVerified),
            "search" => Some(ActivityKind::Search),
            "banned" => Some(ActivityKind::Banned),
            "unbanned" => Some(ActivityKind::Unbanned),
            _ => None,
        }
    }
}

/// Per-user record, one per identity.
///
/// Invariants:
/// - `terms_accepted_at` is present iff `terms_accepted` is true
/// - `banned_at` is present iff `banned` is true
/// - `search_count` only increases
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
    pub channel_verified: bool,
    pub banned: bool,
    pub banned_at: Option<DateTime<Utc>>,
    pub search_count: u64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub last_activity_kind: Option<ActivityKind>,
}

impl UserRecord {
    /// Default record on first contact: terms pending, not banned, zero counters.
    pub fn new(id: UserId, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name: None,
            handle: None,
            joined_at,
            terms_accepted: false,
            terms_accepted_at: None,
            channel_verified: false,
            banned: false,
            banned_at: None,
            search_count: 0,
            last_activity_at: None,
            last_activity_kind: None,
        }
    }

    pub fn note_activity(&mut self, kind: ActivityKind, at: DateTime<Utc>) {
        self.last_activity_at = Some(at);
        self.last_activity_kind = Some(kind);
    }

    /// One-time terms acceptance; the timestamp is stamped exactly once.
    pub fn accept_terms(&mut self, at: DateTime<Utc>) {
        if !self.terms_accepted {
            self.terms_accepted = true;
            self.terms_accepted_at = Some(at);
        }
        self.note_activity(ActivityKind::TermsAccepted, at);
    }

    pub fn mark_channel_verified(&mut self, at: DateTime<Utc>) {
        self.channel_verified = true;
        self.note_activity(ActivityKind::ChannelVerified, at);
    }

    pub fn set_banned(&mut self, at: DateTime<Utc>) {
        self.banned = true;
        self.banned_at = Some(at);
        self.note_activity(ActivityKind::Banned, at);
    }

    pub fn clear_ban(&mut self, at: DateTime<Utc>) {
        self.banned = false;
        self.banned_at = None;
        self.note_activity(ActivityKind::Unbanned, at);
    }

    /// Exactly one increment per admitted, successfully normalized lookup.
    pub fn record_search(&mut self, at: DateTime<Utc>) {
        self.search_count += 1;
        self.note_activity(ActivityKind::Search, at);
    }
}
