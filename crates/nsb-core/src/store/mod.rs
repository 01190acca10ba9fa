//! Persistence: durable store port + dual-tier gateway.

use async_trait::async_trait;

use crate::{
    domain::{UserId, UserRecord},
    Result,
};

pub mod gateway;
pub mod memory;

pub use gateway::UserGateway;
pub use memory::MemoryStore;

/// Aggregate numbers for the admin stats view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_users: u64,
    pub accepted_users: u64,
    pub total_searches: u64,
}

/// Durable backing store for user records.
///
/// The gateway treats every error here as transient: callers never see it,
/// they get the cache tier instead.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Liveness probe, used once at startup.
    async fn ping(&self) -> Result<()>;

    async fn find(&self, id: UserId) -> Result<Option<UserRecord>>;

    async fn upsert(&self, record: &UserRecord) -> Result<()>;

    /// All records with `terms_accepted = true`.
    async fn list_eligible(&self) -> Result<Vec<UserRecord>>;

    async fn stats(&self) -> Result<StoreStats>;
}
