//! Active-session set and grace-period map shared by the detection loop,
//! the intention timer and the launch sequence.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "suppression";

use crate::{log_debug, log_info};

/// Why a detection was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    ActiveSession,
    GracePeriod { until: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct SuppressionInner {
    active_sessions: HashSet<String>,
    grace_until: HashMap<String, DateTime<Utc>>,
}

pub struct SuppressionStore {
    inner: Mutex<SuppressionInner>,
    clock: Arc<dyn Clock>,
}

impl SuppressionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(SuppressionInner::default()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, SuppressionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_active_session(&self, app_id: &str) {
        if self.lock().active_sessions.insert(app_id.to_string()) {
            log_info!("{app_id} protected by an active intention session");
        }
    }

    pub fn remove_active_session(&self, app_id: &str) {
        if self.lock().active_sessions.remove(app_id) {
            log_info!("{app_id} no longer in an active intention session");
        }
    }

    pub fn is_active_session(&self, app_id: &str) -> bool {
        self.lock().active_sessions.contains(app_id)
    }

    pub fn active_sessions(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.lock().active_sessions.iter().cloned().collect();
        apps.sort();
        apps
    }

    /// Suppress `app_id` until `now + duration`, overwriting any earlier expiry.
    pub fn add_grace_period(&self, app_id: &str, duration: Duration) -> DateTime<Utc> {
        let until = self.clock.now() + duration;
        self.lock().grace_until.insert(app_id.to_string(), until);
        log_info!(
            "{app_id} in grace period for {}s",
            duration.num_seconds()
        );
        until
    }

    /// Raw grace expiry for `app_id`, without eviction.
    pub fn grace_expiry(&self, app_id: &str) -> Option<DateTime<Utc>> {
        self.lock().grace_until.get(app_id).copied()
    }

    pub fn check(&self, app_id: &str, now: DateTime<Utc>) -> Option<Suppression> {
        self.snapshot().check(app_id, now)
    }

    pub fn is_suppressed(&self, app_id: &str, now: DateTime<Utc>) -> bool {
        self.check(app_id, now).is_some()
    }

    /// Lock the store for one detection tick so every read in the tick sees
    /// the same state.
    pub fn snapshot(&self) -> SuppressionSnapshot<'_> {
        SuppressionSnapshot { guard: self.lock() }
    }
}

pub struct SuppressionSnapshot<'a> {
    guard: MutexGuard<'a, SuppressionInner>,
}

impl SuppressionSnapshot<'_> {
    /// Active sessions win over grace periods. An expired grace entry is
    /// evicted as a side effect.
    pub fn check(&mut self, app_id: &str, now: DateTime<Utc>) -> Option<Suppression> {
        if self.guard.active_sessions.contains(app_id) {
            return Some(Suppression::ActiveSession);
        }

        let until = *self.guard.grace_until.get(app_id)?;
        if now < until {
            return Some(Suppression::GracePeriod { until });
        }

        self.guard.grace_until.remove(app_id);
        log_debug!("grace period expired for {app_id}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn store_at_epoch() -> (Arc<ManualClock>, SuppressionStore) {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let store = SuppressionStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn active_sessions_are_idempotent() {
        let (_clock, store) = store_at_epoch();
        store.add_active_session("com.instagram.android");
        store.add_active_session("com.instagram.android");
        assert_eq!(store.active_sessions(), vec!["com.instagram.android".to_string()]);

        store.remove_active_session("com.instagram.android");
        store.remove_active_session("com.instagram.android");
        assert!(store.active_sessions().is_empty());
    }

    #[test]
    fn grace_period_suppresses_until_expiry_then_evicts() {
        let (clock, store) = store_at_epoch();
        let until = store.add_grace_period("com.whatsapp", Duration::seconds(45));
        assert_eq!(until, clock.now() + Duration::seconds(45));

        clock.advance(Duration::seconds(44));
        assert_eq!(
            store.check("com.whatsapp", clock.now()),
            Some(Suppression::GracePeriod { until })
        );

        clock.advance(Duration::seconds(1));
        assert!(!store.is_suppressed("com.whatsapp", clock.now()));
        assert_eq!(store.grace_expiry("com.whatsapp"), None);
    }

    #[test]
    fn grace_period_is_overwritten_not_extended() {
        let (clock, store) = store_at_epoch();
        store.add_grace_period("com.whatsapp", Duration::seconds(45));
        let until = store.add_grace_period("com.whatsapp", Duration::seconds(5));
        assert_eq!(until, clock.now() + Duration::seconds(5));
        assert_eq!(store.grace_expiry("com.whatsapp"), Some(until));
    }

    #[test]
    fn active_session_takes_precedence_over_grace() {
        let (clock, store) = store_at_epoch();
        store.add_grace_period("com.pinterest", Duration::seconds(45));
        store.add_active_session("com.pinterest");
        assert_eq!(
            store.check("com.pinterest", clock.now()),
            Some(Suppression::ActiveSession)
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        AddSession(usize),
        RemoveSession(usize),
        Grace(usize, i64),
        Advance(i64),
    }

    const APPS: [&str; 3] = ["com.instagram.android", "com.reddit.frontpage", "com.whatsapp"];

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..APPS.len()).prop_map(Op::AddSession),
            (0..APPS.len()).prop_map(Op::RemoveSession),
            (0..APPS.len(), 1i64..90).prop_map(|(app, secs)| Op::Grace(app, secs)),
            (0i64..60).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #[test]
        fn suppression_matches_a_simple_model(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            let (clock, store) = store_at_epoch();
            let mut sessions = HashSet::new();
            let mut grace: HashMap<usize, DateTime<Utc>> = HashMap::new();

            for op in ops {
                match op {
                    Op::AddSession(app) => {
                        store.add_active_session(APPS[app]);
                        sessions.insert(app);
                    }
                    Op::RemoveSession(app) => {
                        store.remove_active_session(APPS[app]);
                        sessions.remove(&app);
                    }
                    Op::Grace(app, secs) => {
                        let until = store.add_grace_period(APPS[app], Duration::seconds(secs));
                        grace.insert(app, until);
                    }
                    Op::Advance(secs) => clock.advance(Duration::seconds(secs)),
                }

                let now = clock.now();
                for (index, app) in APPS.iter().enumerate() {
                    let expected = sessions.contains(&index)
                        || grace.get(&index).map(|until| now < *until).unwrap_or(false);
                    prop_assert_eq!(store.is_suppressed(app, now), expected);
                }
            }
        }
    }
}
