use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    domain::{UserId, UserRecord},
    Result,
};

use super::{StoreStats, UserStore};

/// In-memory `UserStore`, used by tests and by deployments that opt out of
/// a durable database.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, UserRecord>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id.0).cloned())
    }

    async fn upsert(&self, record: &UserRecord) -> Result<()> {
        self.users.write().await.insert(record.id.0, record.clone());
        Ok(())
    }

    async fn list_eligible(&self) -> Result<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut eligible: Vec<UserRecord> =
            users.values().filter(|r| r.terms_accepted).cloned().collect();
        eligible.sort_by_key(|r| r.id.0);
        Ok(eligible)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let users = self.users.read().await;
        Ok(StoreStats {
            total_users: users.len() as u64,
            accepted_users: users.values().filter(|r| r.terms_accepted).count() as u64,
            total_searches: users.values().map(|r| r.search_count).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let store = MemoryStore::default();
        let mut rec = UserRecord::new(UserId(10), Utc::now());
        rec.display_name = Some("Jane".to_string());

        store.upsert(&rec).await.unwrap();
        let found = store.find(UserId(10)).await.unwrap().unwrap();
        assert_eq!(found, rec);
        assert!(store.find(UserId(11)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn eligible_listing_is_stable() {
        let store = MemoryStore::default();
        for id in [3, 1, 2] {
            let mut rec = UserRecord::new(UserId(id), Utc::now());
            rec.accept_terms(Utc::now());
            store.upsert(&rec).await.unwrap();
        }

        let ids: Vec<i64> = store
            .list_eligible()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
