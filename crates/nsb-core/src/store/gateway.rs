use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{UserId, UserRecord};

use super::{StoreStats, UserStore};

/// Dual-tier user persistence.
///
/// The durable store is the system of record; the in-memory map is a
/// write-through cache and the sole source of truth while the durable store
/// is unreachable. Connectivity is probed once at startup and never
/// re-probed: a store that recovers mid-session is not rediscovered until
/// restart. The trade-off is deliberate: always respond, possibly from a
/// stale cache, rather than block on storage availability.
pub struct UserGateway {
    durable: Option<Arc<dyn UserStore>>,
    cache: RwLock<HashMap<i64, UserRecord>>,
    connected: AtomicBool,
}

impl UserGateway {
    pub fn new(durable: Option<Arc<dyn UserStore>>) -> Self {
        Self {
            durable,
            cache: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(false),
        }
    }

    /// Startup liveness probe. Sets the connectivity flag for the rest of
    /// the process lifetime.
    pub async fn probe(&self) -> bool {
        let Some(store) = &self.durable else {
            warn!("no durable store configured; running on cache only");
            return false;
        };

        match store.ping().await {
            Ok(()) => {
                self.connected.store(true, Ordering::Relaxed);
                info!("durable store reachable");
                true
            }
            Err(e) => {
                warn!("durable store unreachable, running on cache only: {e}");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn active_store(&self) -> Option<&Arc<dyn UserStore>> {
        if self.is_connected() {
            self.durable.as_ref()
        } else {
            None
        }
    }

    /// Prefer the durable store; on failure or miss, fall back to the cache.
    pub async fn load(&self, id: UserId) -> Option<UserRecord> {
        if let Some(store) = self.active_store() {
            match store.find(id).await {
                Ok(Some(record)) => {
                    self.cache.write().await.insert(id.0, record.clone());
                    return Some(record);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("durable load failed for user {}: {e}", id.0);
                }
            }
        }

        self.cache.read().await.get(&id.0).cloned()
    }

    /// Always updates the cache; the durable write is best-effort. A durable
    /// failure is logged and swallowed: the cache copy guarantees forward
    /// progress for the rest of the process lifetime.
    pub async fn save(&self, record: UserRecord) {
        self.cache.write().await.insert(record.id.0, record.clone());

        let Some(store) = self.active_store() else {
            return;
        };
        if let Err(e) = store.upsert(&record).await {
            warn!("durable save failed for user {}: {e}", record.id.0);
        }
    }

    /// All records with `terms_accepted = true`, durable first, cache scan
    /// on failure.
    pub async fn list_eligible(&self) -> Vec<UserRecord> {
        if let Some(store) = self.active_store() {
            match store.list_eligible().await {
                Ok(records) => return records,
                Err(e) => warn!("durable eligible query failed: {e}"),
            }
        }

        self.cache
            .read()
            .await
            .values()
            .filter(|r| r.terms_accepted)
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> StoreStats {
        if let Some(store) = self.active_store() {
            match store.stats().await {
                Ok(stats) => return stats,
                Err(e) => warn!("durable stats query failed: {e}"),
            }
        }

        let cache = self.cache.read().await;
        StoreStats {
            total_users: cache.len() as u64,
            accepted_users: cache.values().filter(|r| r.terms_accepted).count() as u64,
            total_searches: cache.values().map(|r| r.search_count).sum(),
        }
    }
}
