use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::Clock;

#[derive(Debug)]
struct Pending<A> {
    deadline: Instant,
    seq: u64,
    action: A,
}

/// Per-key delayed actions. At most one action is pending per key; a new
/// `schedule` for the same key replaces the old action and restarts its
/// timer.
///
/// Actions are values handed back to the owner by [`poll`](Self::poll) or
/// [`flush`](Self::flush), so a cancelled entry is simply gone: there is no
/// timer left behind that could still fire.
pub struct DebounceScheduler<K, A> {
    clock: Arc<dyn Clock>,
    pending: HashMap<K, Pending<A>>,
    next_seq: u64,
}

impl<K, A> DebounceScheduler<K, A>
where
    K: Eq + Hash + Clone,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn schedule(&mut self, key: K, delay: Duration, action: A) {
        let deadline = self.clock.now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            key,
            Pending {
                deadline,
                seq,
                action,
            },
        );
    }

    /// Drops the pending action for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Removes the pending action for `key` so the caller can run it now.
    pub fn flush(&mut self, key: &K) -> Option<A> {
        self.pending.remove(key).map(|pending| pending.action)
    }

    /// Takes every action whose deadline has passed, earliest first.
    pub fn poll(&mut self) -> Vec<(K, A)> {
        let now = self.clock.now();
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let mut fired: Vec<(Instant, u64, K, A)> = due
            .into_iter()
            .filter_map(|key| {
                self.pending
                    .remove(&key)
                    .map(|pending| (pending.deadline, pending.seq, key, pending.action))
            })
            .collect();
        fired.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        fired
            .into_iter()
            .map(|(_, _, key, action)| (key, action))
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_action(&self, key: &K) -> Option<&A> {
        self.pending.get(key).map(|pending| &pending.action)
    }

    pub fn keys(&self) -> Vec<K> {
        self.pending.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K, A> std::fmt::Debug for DebounceScheduler<K, A>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journaling::clock::ManualClock;

    fn scheduler() -> (ManualClock, DebounceScheduler<&'static str, u32>) {
        let clock = ManualClock::new();
        let scheduler = DebounceScheduler::new(Arc::new(clock.clone()));
        (clock, scheduler)
    }

    #[test]
    fn fires_only_after_quiet_period() {
        let (clock, mut scheduler) = scheduler();
        scheduler.schedule("a", Duration::from_millis(1000), 1);
        clock.advance_ms(999);
        assert!(scheduler.poll().is_empty());
        clock.advance_ms(1);
        assert_eq!(scheduler.poll(), vec![("a", 1)]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn rescheduling_restarts_timer_with_latest_action() {
        let (clock, mut scheduler) = scheduler();
        scheduler.schedule("a", Duration::from_millis(1000), 1);
        clock.advance_ms(600);
        scheduler.schedule("a", Duration::from_millis(1000), 2);
        clock.advance_ms(600);
        assert!(scheduler.poll().is_empty(), "restart pushes the deadline out");
        clock.advance_ms(400);
        assert_eq!(scheduler.poll(), vec![("a", 2)]);
        assert_eq!(scheduler.len(), 0);
    }

    #[test]
    fn cancelled_action_never_runs() {
        let (clock, mut scheduler) = scheduler();
        scheduler.schedule("a", Duration::from_millis(10), 1);
        assert!(scheduler.cancel(&"a"));
        assert!(!scheduler.cancel(&"a"));
        clock.advance_ms(1000);
        assert!(scheduler.poll().is_empty());
    }

    #[test]
    fn flush_hands_back_pending_action() {
        let (clock, mut scheduler) = scheduler();
        scheduler.schedule("a", Duration::from_millis(1000), 7);
        assert_eq!(scheduler.flush(&"a"), Some(7));
        assert_eq!(scheduler.flush(&"a"), None);
        clock.advance_ms(2000);
        assert!(scheduler.poll().is_empty());
    }

    #[test]
    fn keys_are_independent_and_fire_in_deadline_order() {
        let (clock, mut scheduler) = scheduler();
        scheduler.schedule("late", Duration::from_millis(300), 2);
        scheduler.schedule("early", Duration::from_millis(100), 1);
        scheduler.schedule("same", Duration::from_millis(300), 3);
        scheduler.cancel(&"early");
        assert_eq!(
            scheduler.next_deadline(),
            Some(clock.now() + Duration::from_millis(300))
        );
        clock.advance_ms(500);
        assert_eq!(scheduler.poll(), vec![("late", 2), ("same", 3)]);
    }
}
