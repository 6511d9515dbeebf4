//! Timer queue for delayed loop callbacks
//!
//! Deadlines live in a min-heap; callbacks live in a map keyed by token so a
//! cancel is a single map removal. Heap entries whose token is gone are skipped,
//! and the heap is rebuilt once they outnumber the live timers.

use crate::{Callback, TimerToken};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Stale heap entries tolerated before a rebuild is considered
const COMPACT_MIN_STALE: usize = 64;

/// Entry in the timer heap
struct TimerEntry {
    /// When the callback becomes due
    fire_at: Instant,
    /// Registration token (also breaks deadline ties in registration order)
    token: TimerToken,
}

// Reverse ordering for min-heap (earliest deadline first)
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.token.cmp(&self.token))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.token == other.token
    }
}

impl Eq for TimerEntry {}

/// Pending timers of one loop
pub(crate) struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    callbacks: FxHashMap<TimerToken, Callback>,
    /// Heap entries whose callback was cancelled
    stale: usize,
    next_token: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            callbacks: FxHashMap::default(),
            stale: 0,
            next_token: 1,
        }
    }

    /// Register a callback due at `fire_at`
    pub(crate) fn schedule(&mut self, fire_at: Instant, callback: Callback) -> TimerToken {
        let token = TimerToken::from_u64(self.next_token);
        self.next_token += 1;
        self.heap.push(TimerEntry { fire_at, token });
        self.callbacks.insert(token, callback);
        token
    }

    /// Remove a pending timer, handing back its callback so the caller can
    /// drop it outside any lock
    pub(crate) fn cancel(&mut self, token: TimerToken) -> Option<Callback> {
        let callback = self.callbacks.remove(&token)?;
        self.stale += 1;
        if self.stale >= COMPACT_MIN_STALE && self.stale > self.callbacks.len() {
            self.compact();
        }
        Some(callback)
    }

    /// Drop heap entries of cancelled timers
    fn compact(&mut self) {
        let callbacks = &self.callbacks;
        self.heap.retain(|entry| callbacks.contains_key(&entry.token));
        self.stale = 0;
    }

    /// Take the earliest callback whose deadline is at or before `now`
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Callback> {
        while let Some(entry) = self.heap.peek() {
            if entry.fire_at > now {
                return None;
            }
            let token = entry.token;
            self.heap.pop();
            match self.callbacks.remove(&token) {
                Some(callback) => return Some(callback),
                None => self.stale = self.stale.saturating_sub(1),
            }
        }
        None
    }

    /// Deadline of the earliest live timer
    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if self.callbacks.contains_key(&entry.token) {
                return Some(entry.fire_at);
            }
            self.heap.pop();
            self.stale = self.stale.saturating_sub(1);
        }
        None
    }

    /// Number of live timers
    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Remove every pending timer
    pub(crate) fn drain(&mut self) -> Vec<Callback> {
        self.heap.clear();
        self.stale = 0;
        self.callbacks.drain().map(|(_, callback)| callback).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Callback {
        let log = log.clone();
        Box::new(move || log.lock().push(value))
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let now = Instant::now();

        timers.schedule(now + Duration::from_millis(30), recorder(&log, 3));
        timers.schedule(now + Duration::from_millis(10), recorder(&log, 1));
        timers.schedule(now + Duration::from_millis(20), recorder(&log, 2));

        let later = now + Duration::from_millis(50);
        while let Some(callback) = timers.pop_due(later) {
            callback();
        }

        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert_eq!(timers.len(), 0);
    }

    #[test]
    fn test_equal_deadlines_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let at = Instant::now();

        for value in 0..5 {
            timers.schedule(at, recorder(&log, value));
        }
        while let Some(callback) = timers.pop_due(at) {
            callback();
        }

        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_not_due_yet() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let deadline = now + Duration::from_secs(60);

        timers.schedule(deadline, recorder(&log, 1));

        assert!(timers.pop_due(now).is_none());
        assert_eq!(timers.next_deadline(), Some(deadline));
    }

    #[test]
    fn test_cancel_skips_entry() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let now = Instant::now();

        let first = timers.schedule(now, recorder(&log, 1));
        timers.schedule(now + Duration::from_millis(5), recorder(&log, 2));

        assert!(timers.cancel(first).is_some());
        assert!(timers.cancel(first).is_none());
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(5)));

        while let Some(callback) = timers.pop_due(now + Duration::from_millis(10)) {
            callback();
        }
        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn test_cancelled_far_timers_do_not_pile_up() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let now = Instant::now();
        let far = now + Duration::from_secs(3600);

        let keep = timers.schedule(far, recorder(&log, 1));
        for _ in 0..10_000 {
            let token = timers.schedule(far, recorder(&log, 2));
            assert!(timers.cancel(token).is_some());
        }

        assert_eq!(timers.len(), 1);
        assert!(timers.heap.len() <= COMPACT_MIN_STALE + 1);
        assert_eq!(timers.next_deadline(), Some(far));

        assert!(timers.cancel(keep).is_some());
        let near = timers.schedule(now, recorder(&log, 3));
        while let Some(callback) = timers.pop_due(now) {
            callback();
        }
        assert_eq!(*log.lock(), vec![3]);
        assert!(timers.cancel(near).is_none());
    }

    #[test]
    fn test_drain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut timers = TimerQueue::new();
        let now = Instant::now();

        timers.schedule(now, recorder(&log, 1));
        timers.schedule(now, recorder(&log, 2));

        let drained = timers.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(timers.len(), 0);
        assert!(timers.next_deadline().is_none());
        assert!(log.lock().is_empty());
    }
}
