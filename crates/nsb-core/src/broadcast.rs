use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::warn;

use crate::{domain::ChatId, ports::Messenger, store::UserGateway};

/// Per-broadcast delivery tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub succeeded: u32,
    pub failed: u32,
}

/// Best-effort fan-out of an administrative message to every eligible user.
///
/// Delivery is sequential with a fixed inter-send delay to respect the
/// platform's send-rate ceiling. Each send has its own failure boundary:
/// one failed delivery never halts the remainder.
pub struct Broadcaster {
    gateway: Arc<UserGateway>,
    messenger: Arc<dyn Messenger>,
    send_delay: Duration,
}

impl Broadcaster {
    pub fn new(
        gateway: Arc<UserGateway>,
        messenger: Arc<dyn Messenger>,
        send_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            messenger,
            send_delay,
        }
    }

    pub async fn broadcast(&self, html: &str) -> BroadcastOutcome {
        let targets = self.gateway.list_eligible().await;

        let mut outcome = BroadcastOutcome::default();
        for record in targets {
            match self.messenger.send_html(ChatId(record.id.0), html).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    warn!("broadcast delivery to user {} failed: {e}", record.id.0);
                    outcome.failed += 1;
                }
            }
            sleep(self.send_delay).await;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use crate::{
        domain::{UserId, UserRecord},
        errors::Error,
        store::MemoryStore,
        Result,
    };

    use super::*;

    struct RecordingMessenger {
        delivered: Mutex<Vec<i64>>,
        fail_on: Option<i64>,
    }

    impl RecordingMessenger {
        fn new(fail_on: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail_on,
            })
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_html(&self, chat_id: ChatId, _html: &str) -> Result<()> {
            if self.fail_on == Some(chat_id.0) {
                return Err(Error::External("blocked by user".to_string()));
            }
            self.delivered.lock().await.push(chat_id.0);
            Ok(())
        }
    }

    async fn gateway_with_eligible(ids: &[i64]) -> Arc<UserGateway> {
        let gateway = Arc::new(UserGateway::new(Some(Arc::new(MemoryStore::default()))));
        gateway.probe().await;
        for &id in ids {
            let mut record = UserRecord::new(UserId(id), Utc::now());
            record.accept_terms(Utc::now());
            gateway.save(record).await;
        }
        gateway
    }

    #[tokio::test]
    async fn partial_failure_is_tallied_and_delivery_continues() {
        let gateway = gateway_with_eligible(&[1, 2, 3]).await;
        let messenger = RecordingMessenger::new(Some(2));
        let broadcaster = Broadcaster::new(gateway, messenger.clone(), Duration::ZERO);

        let outcome = broadcaster.broadcast("<b>hi</b>").await;
        assert_eq!(
            outcome,
            BroadcastOutcome {
                succeeded: 2,
                failed: 1,
            }
        );
        assert_eq!(*messenger.delivered.lock().await, vec![1, 3]);
    }

    #[tokio::test]
    async fn only_eligible_users_are_targeted() {
        let gateway = gateway_with_eligible(&[1]).await;
        // A user who never accepted terms is not a broadcast target.
        gateway.save(UserRecord::new(UserId(9), Utc::now())).await;

        let messenger = RecordingMessenger::new(None);
        let broadcaster = Broadcaster::new(gateway, messenger.clone(), Duration::ZERO);

        let outcome = broadcaster.broadcast("x").await;
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(*messenger.delivered.lock().await, vec![1]);
    }

    #[tokio::test]
    async fn empty_target_set_is_a_clean_zero() {
        let gateway = gateway_with_eligible(&[]).await;
        let broadcaster =
            Broadcaster::new(gateway, RecordingMessenger::new(None), Duration::ZERO);

        assert_eq!(broadcaster.broadcast("x").await, BroadcastOutcome::default());
    }
}
