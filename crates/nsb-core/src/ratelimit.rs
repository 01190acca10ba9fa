use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::domain::UserId;

/// Per-user lookup cooldown.
///
/// Admission always stamps the clock: a request that the limiter admits but
/// a later stage denies does not get its slot refunded. Entries are never
/// evicted; the key space is bounded by distinct users seen.
#[derive(Clone, Debug)]
pub struct CooldownLimiter {
    cooldown: Duration,
    last_admitted: HashMap<UserId, Instant>,
}

impl CooldownLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_admitted: HashMap::new(),
        }
    }

    pub fn check(&mut self, user_id: UserId) -> (bool, Option<Duration>) {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> (bool, Option<Duration>) {
        if let Some(last) = self.last_admitted.get(&user_id) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.cooldown {
                return (false, Some(self.cooldown - elapsed));
            }
        }

        self.last_admitted.insert(user_id, now);
        (true, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_within_window_is_denied() {
        let start = Instant::now();
        let mut rl = CooldownLimiter::new(Duration::from_secs(5));
        let u = UserId(1);

        assert!(rl.check_at(u, start).0);

        let (ok, remaining) = rl.check_at(u, start + Duration::from_secs(2));
        assert!(!ok);
        assert_eq!(remaining, Some(Duration::from_secs(3)));

        // Third attempt after the window elapses is admitted.
        assert!(rl.check_at(u, start + Duration::from_secs(5)).0);
    }

    #[test]
    fn unknown_user_is_admitted() {
        let mut rl = CooldownLimiter::new(Duration::from_secs(5));
        assert!(rl.check_at(UserId(42), Instant::now()).0);
    }

    #[test]
    fn users_do_not_share_windows() {
        let start = Instant::now();
        let mut rl = CooldownLimiter::new(Duration::from_secs(5));

        assert!(rl.check_at(UserId(1), start).0);
        assert!(rl.check_at(UserId(2), start).0);
    }

    #[test]
    fn denied_check_does_not_move_the_stamp() {
        let start = Instant::now();
        let mut rl = CooldownLimiter::new(Duration::from_secs(5));
        let u = UserId(7);

        assert!(rl.check_at(u, start).0);
        assert!(!rl.check_at(u, start + Duration::from_secs(4)).0);
        // The denied attempt at t+4 must not reset the window: t+5 passes.
        assert!(rl.check_at(u, start + Duration::from_secs(5)).0);
    }
}
