use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    domain::{ActivityKind, ChatId, UserId, UserRecord},
    ports::MembershipProbe,
    ratelimit::CooldownLimiter,
    store::UserGateway,
};

/// Onboarding state, derived from record flags rather than stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Standing {
    Banned,
    AwaitingTerms,
    AwaitingChannel,
    Eligible,
}

impl Standing {
    /// Pure derivation rule. A ban overrides everything, so clearing it
    /// restores exactly the state implied by the remaining flags.
    pub fn of(record: &UserRecord) -> Self {
        if record.banned {
            return Standing::Banned;
        }
        if !record.terms_accepted {
            return Standing::AwaitingTerms;
        }
        if !record.channel_verified {
            return Standing::AwaitingChannel;
        }
        Standing::Eligible
    }
}

/// Reason a gated action was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    Banned,
    TermsRequired,
    ChannelRequired,
    WrongContext,
    Cooldown(Duration),
}

/// The admission decision point for every gated action.
///
/// Owns the cooldown bookkeeping and consults the membership probe live on
/// each evaluation; the persisted `channel_verified` flag is only ever set,
/// never cleared, by a probe outcome.
pub struct AccessGate {
    gateway: Arc<UserGateway>,
    membership: Arc<dyn MembershipProbe>,
    limiter: Mutex<CooldownLimiter>,
    lookup_chat: ChatId,
}

impl AccessGate {
    pub fn new(
        gateway: Arc<UserGateway>,
        membership: Arc<dyn MembershipProbe>,
        lookup_chat: ChatId,
        cooldown: Duration,
    ) -> Self {
        Self {
            gateway,
            membership,
            limiter: Mutex::new(CooldownLimiter::new(cooldown)),
            lookup_chat,
        }
    }

    /// Create-or-refresh on contact. First contact creates the default
    /// record; display metadata is last-write-wins.
    pub async fn ensure_user(
        &self,
        id: UserId,
        display_name: Option<String>,
        handle: Option<String>,
    ) -> UserRecord {
        let now = Utc::now();
        let mut record = match self.gateway.load(id).await {
            Some(existing) => existing,
            None => {
                let mut fresh = UserRecord::new(id, now);
                fresh.note_activity(ActivityKind::Start, now);
                fresh
            }
        };

        if display_name.is_some() {
            record.display_name = display_name;
        }
        if handle.is_some() {
            record.handle = handle;
        }

        self.gateway.save(record.clone()).await;
        record
    }

    pub async fn admit_lookup(
        &self,
        record: &mut UserRecord,
        chat: ChatId,
    ) -> std::result::Result<(), Denial> {
        self.admit_lookup_at(record, chat, Instant::now()).await
    }

    /// Ordered cheapest/most-decisive first: local flags, then the network
    /// membership probe, then the group-context check, then rate-limit
    /// bookkeeping. First failing check wins.
    pub async fn admit_lookup_at(
        &self,
        record: &mut UserRecord,
        chat: ChatId,
        now: Instant,
    ) -> std::result::Result<(), Denial> {
        if record.banned {
            return Err(Denial::Banned);
        }
        if !record.terms_accepted {
            return Err(Denial::TermsRequired);
        }

        if !self.probe_membership(record.id).await {
            // The persisted flag stays as-is: a failed re-check only
            // affects this request.
            return Err(Denial::ChannelRequired);
        }
        if !record.channel_verified {
            record.mark_channel_verified(Utc::now());
            self.gateway.save(record.clone()).await;
        }

        if chat != self.lookup_chat {
            return Err(Denial::WrongContext);
        }

        let (admitted, remaining) = self.limiter.lock().await.check_at(record.id, now);
        if !admitted {
            return Err(Denial::Cooldown(remaining.unwrap_or_default()));
        }

        Ok(())
    }

    /// One-time terms acceptance for a known user.
    pub async fn accept_terms(&self, id: UserId) -> Option<UserRecord> {
        let mut record = self.gateway.load(id).await?;
        record.accept_terms(Utc::now());
        self.gateway.save(record.clone()).await;
        Some(record)
    }

    /// Re-run the membership probe on demand (join-button callback); a pass
    /// is persisted, a failure changes nothing.
    pub async fn recheck_channel(&self, id: UserId) -> bool {
        if !self.probe_membership(id).await {
            return false;
        }
        if let Some(mut record) = self.gateway.load(id).await {
            if !record.channel_verified {
                record.mark_channel_verified(Utc::now());
                self.gateway.save(record).await;
            }
        }
        true
    }

    pub async fn ban(&self, target: UserId) -> Option<UserRecord> {
        let mut record = self.gateway.load(target).await?;
        record.set_banned(Utc::now());
        self.gateway.save(record.clone()).await;
        Some(record)
    }

    pub async fn unban(&self, target: UserId) -> Option<UserRecord> {
        let mut record = self.gateway.load(target).await?;
        record.clear_ban(Utc::now());
        self.gateway.save(record.clone()).await;
        Some(record)
    }

    async fn probe_membership(&self, id: UserId) -> bool {
        match self.membership.is_member(id).await {
            Ok(member) => member,
            Err(e) => {
                warn!("membership probe failed for user {}: {e}", id.0);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::{errors::Error, store::MemoryStore, Result};

    use super::*;

    struct FakeProbe {
        member: AtomicBool,
        erroring: AtomicBool,
    }

    impl FakeProbe {
        fn member(yes: bool) -> Arc<Self> {
            Arc::new(Self {
                member: AtomicBool::new(yes),
                erroring: AtomicBool::new(false),
            })
        }

        fn set_member(&self, yes: bool) {
            self.member.store(yes, Ordering::Relaxed);
        }

        fn set_erroring(&self, yes: bool) {
            self.erroring.store(yes, Ordering::Relaxed);
        }
    }

    #[async_trait]
    impl MembershipProbe for FakeProbe {
        async fn is_member(&self, _user_id: UserId) -> Result<bool> {
            if self.erroring.load(Ordering::Relaxed) {
                return Err(Error::External("telegram unavailable".to_string()));
            }
            Ok(self.member.load(Ordering::Relaxed))
        }
    }

    const GROUP: ChatId = ChatId(-100);

    fn gate_with(probe: Arc<FakeProbe>) -> (Arc<UserGateway>, AccessGate) {
        let gateway = Arc::new(UserGateway::new(Some(Arc::new(MemoryStore::default()))));
        let gate = AccessGate::new(gateway.clone(), probe, GROUP, Duration::from_secs(5));
        (gateway, gate)
    }

    async fn eligible_record(gate: &AccessGate, id: i64) -> UserRecord {
        let mut record = gate.ensure_user(UserId(id), None, None).await;
        record.accept_terms(Utc::now());
        record.mark_channel_verified(Utc::now());
        record
    }

    #[test]
    fn standing_derivation_table() {
        let now = Utc::now();
        let mut rec = UserRecord::new(UserId(1), now);
        assert_eq!(Standing::of(&rec), Standing::AwaitingTerms);

        rec.accept_terms(now);
        assert_eq!(Standing::of(&rec), Standing::AwaitingChannel);

        rec.mark_channel_verified(now);
        assert_eq!(Standing::of(&rec), Standing::Eligible);

        rec.set_banned(now);
        assert_eq!(Standing::of(&rec), Standing::Banned);
    }

    #[tokio::test]
    async fn banned_overrides_everything() {
        let (_, gate) = gate_with(FakeProbe::member(true));
        let mut record = eligible_record(&gate, 1).await;
        record.set_banned(Utc::now());

        assert_eq!(
            gate.admit_lookup(&mut record, GROUP).await,
            Err(Denial::Banned)
        );
    }

    #[tokio::test]
    async fn unban_restores_state_implied_by_flags() {
        let (gateway, gate) = gate_with(FakeProbe::member(true));
        let record = eligible_record(&gate, 2).await;
        gateway.save(record).await;

        gate.ban(UserId(2)).await.unwrap();
        let banned = gateway.load(UserId(2)).await.unwrap();
        assert_eq!(Standing::of(&banned), Standing::Banned);

        let restored = gate.unban(UserId(2)).await.unwrap();
        assert_eq!(Standing::of(&restored), Standing::Eligible);
        assert!(restored.banned_at.is_none());
    }

    #[tokio::test]
    async fn terms_checked_before_membership() {
        let probe = FakeProbe::member(true);
        let (_, gate) = gate_with(probe);
        let mut record = gate.ensure_user(UserId(3), None, None).await;

        assert_eq!(
            gate.admit_lookup(&mut record, GROUP).await,
            Err(Denial::TermsRequired)
        );
    }

    #[tokio::test]
    async fn membership_pass_persists_flag() {
        let (gateway, gate) = gate_with(FakeProbe::member(true));
        let mut record = gate.ensure_user(UserId(4), None, None).await;
        record.accept_terms(Utc::now());

        gate.admit_lookup(&mut record, GROUP).await.unwrap();
        assert!(record.channel_verified);
        assert!(gateway.load(UserId(4)).await.unwrap().channel_verified);
    }

    #[tokio::test]
    async fn failed_probe_denies_but_keeps_sticky_flag() {
        let probe = FakeProbe::member(true);
        let (gateway, gate) = gate_with(probe.clone());
        let mut record = eligible_record(&gate, 5).await;
        gateway.save(record.clone()).await;

        probe.set_member(false);
        assert_eq!(
            gate.admit_lookup(&mut record, GROUP).await,
            Err(Denial::ChannelRequired)
        );

        // The persisted flag is never cleared by a failed re-check.
        assert!(gateway.load(UserId(5)).await.unwrap().channel_verified);
    }

    #[tokio::test]
    async fn probe_error_counts_as_not_a_member() {
        let probe = FakeProbe::member(true);
        probe.set_erroring(true);
        let (_, gate) = gate_with(probe);
        let mut record = eligible_record(&gate, 6).await;

        assert_eq!(
            gate.admit_lookup(&mut record, GROUP).await,
            Err(Denial::ChannelRequired)
        );
    }

    #[tokio::test]
    async fn wrong_context_is_denied_after_membership() {
        let (_, gate) = gate_with(FakeProbe::member(true));
        let mut record = eligible_record(&gate, 7).await;

        assert_eq!(
            gate.admit_lookup(&mut record, ChatId(12345)).await,
            Err(Denial::WrongContext)
        );
    }

    #[tokio::test]
    async fn cooldown_denies_second_admission() {
        let (_, gate) = gate_with(FakeProbe::member(true));
        let mut record = eligible_record(&gate, 8).await;
        let start = Instant::now();

        gate.admit_lookup_at(&mut record, GROUP, start).await.unwrap();

        let second = gate
            .admit_lookup_at(&mut record, GROUP, start + Duration::from_secs(2))
            .await;
        assert!(matches!(second, Err(Denial::Cooldown(_))));

        gate.admit_lookup_at(&mut record, GROUP, start + Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn recheck_persists_only_on_pass() {
        let probe = FakeProbe::member(false);
        let (gateway, gate) = gate_with(probe.clone());
        let mut record = gate.ensure_user(UserId(9), None, None).await;
        record.accept_terms(Utc::now());
        gateway.save(record).await;

        assert!(!gate.recheck_channel(UserId(9)).await);
        assert!(!gateway.load(UserId(9)).await.unwrap().channel_verified);

        probe.set_member(true);
        assert!(gate.recheck_channel(UserId(9)).await);
        assert!(gateway.load(UserId(9)).await.unwrap().channel_verified);
    }

    #[tokio::test]
    async fn ensure_user_refreshes_metadata_last_write_wins() {
        let (gateway, gate) = gate_with(FakeProbe::member(true));

        gate.ensure_user(UserId(10), Some("Old".to_string()), None).await;
        gate.ensure_user(UserId(10), Some("New".to_string()), Some("newer".to_string()))
            .await;
        let record = gateway.load(UserId(10)).await.unwrap();
        assert_eq!(record.display_name.as_deref(), Some("New"));
        assert_eq!(record.handle.as_deref(), Some("newer"));

        // Absent metadata keeps the previous value.
        gate.ensure_user(UserId(10), None, None).await;
        let record = gateway.load(UserId(10)).await.unwrap();
        assert_eq!(record.display_name.as_deref(), Some("New"));
    }

    #[tokio::test]
    async fn ban_unknown_user_is_a_noop() {
        let (_, gate) = gate_with(FakeProbe::member(true));
        assert!(gate.ban(UserId(404)).await.is_none());
        assert!(gate.unban(UserId(404)).await.is_none());
    }
}
