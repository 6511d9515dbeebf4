//! Cooperative single-threaded event loop
//!
//! All posted work runs serially on the thread that created the loop. Other
//! threads may post, schedule timers, cancel them and dispose the loop; only the
//! owner thread pumps it (`read_and_dispatch`, `sleep`, `run`).

use crate::timer::TimerQueue;
use crate::{Callback, LoopError, LoopHandle, LoopId, LoopResult, TimerToken};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Longest accepted timer delay; longer delays are clamped (about 24.8 days)
pub const MAX_TIMER_DELAY: Duration = Duration::from_millis(i32::MAX as u64);

static DEFAULT_LOOP: OnceLock<EventLoop> = OnceLock::new();

/// Work waiting for the owner thread
struct LoopState {
    /// Callbacks posted with `post_async`, FIFO
    queue: VecDeque<Callback>,
    /// Callbacks posted with `post_timer`
    timers: TimerQueue,
}

struct Shared {
    id: LoopId,
    name: String,
    owner: ThreadId,
    /// Monotonic: flips to true once, under the state lock
    disposed: AtomicBool,
    state: Mutex<LoopState>,
    /// Wakes the owner thread when work arrives or the loop is disposed
    wakeup: Condvar,
}

/// Handle to one event loop. Clones refer to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    shared: Arc<Shared>,
}

impl EventLoop {
    /// Create a loop owned by the calling thread
    pub fn new() -> Self {
        let id = LoopId::new();
        Self::build(id, id.to_string())
    }

    /// Create a loop owned by the calling thread with a diagnostic name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::build(LoopId::new(), name.into())
    }

    fn build(id: LoopId, name: String) -> Self {
        let owner = thread::current().id();
        tracing::debug!(loop_id = id.as_u64(), name = %name, ?owner, "event loop created");
        Self {
            shared: Arc::new(Shared {
                id,
                name,
                owner,
                disposed: AtomicBool::new(false),
                state: Mutex::new(LoopState {
                    queue: VecDeque::new(),
                    timers: TimerQueue::new(),
                }),
                wakeup: Condvar::new(),
            }),
        }
    }

    /// The process-wide default loop
    ///
    /// Created on first access; the thread making that first call becomes the
    /// loop's owner and is expected to pump it. There is no teardown beyond
    /// `dispose`, after which the default loop stays disposed.
    pub fn default_loop() -> EventLoop {
        DEFAULT_LOOP
            .get_or_init(|| EventLoop::with_name("Default"))
            .clone()
    }

    /// Shared trait-object handle to this loop
    pub fn handle(&self) -> Arc<dyn LoopHandle> {
        Arc::new(self.clone())
    }

    /// Loop identity
    pub fn id(&self) -> LoopId {
        self.shared.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The thread that owns this loop
    pub fn owner_thread(&self) -> ThreadId {
        self.shared.owner
    }

    /// Whether the calling thread owns this loop
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.shared.owner
    }

    /// Whether the loop has been disposed
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Number of queued callbacks plus live timers
    pub fn pending(&self) -> usize {
        let state = self.shared.state.lock();
        state.queue.len() + state.timers.len()
    }

    /// Run at most one unit of work: a due timer first, otherwise the oldest
    /// queued callback
    ///
    /// Returns `Ok(false)` when there was nothing to do.
    pub fn read_and_dispatch(&self) -> LoopResult<bool> {
        self.check_owner()?;

        let callback = {
            let mut state = self.shared.state.lock();
            if self.is_disposed() {
                return Err(LoopError::Disposed);
            }
            let now = Instant::now();
            match state.timers.pop_due(now) {
                Some(callback) => Some(callback),
                None => state.queue.pop_front(),
            }
        };

        match callback {
            Some(callback) => {
                self.invoke(callback);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Park the owner thread until work is available, a timer is due, or the
    /// loop is disposed
    pub fn sleep(&self) -> LoopResult<()> {
        self.check_owner()?;

        let mut state = self.shared.state.lock();
        loop {
            if self.is_disposed() || !state.queue.is_empty() {
                return Ok(());
            }
            match state.timers.next_deadline() {
                Some(deadline) if deadline <= Instant::now() => return Ok(()),
                Some(deadline) => {
                    self.shared.wakeup.wait_until(&mut state, deadline);
                }
                None => self.shared.wakeup.wait(&mut state),
            }
        }
    }

    /// Pump the loop until it is disposed
    pub fn run(&self) -> LoopResult<()> {
        loop {
            match self.read_and_dispatch() {
                Ok(true) => {}
                Ok(false) => self.sleep()?,
                Err(LoopError::Disposed) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    /// Pump until no work is immediately runnable (timers not yet due are left)
    pub fn run_until_idle(&self) -> LoopResult<usize> {
        let mut executed = 0;
        while self.read_and_dispatch()? {
            executed += 1;
        }
        Ok(executed)
    }

    /// Dispose the loop
    ///
    /// Pending callbacks and timers are dropped without running. Safe to call
    /// from any thread and more than once.
    pub fn dispose(&self) {
        let (queue, timers) = {
            let mut state = self.shared.state.lock();
            if self.shared.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            (std::mem::take(&mut state.queue), state.timers.drain())
        };
        self.shared.wakeup.notify_all();

        tracing::debug!(
            loop_id = self.shared.id.as_u64(),
            name = %self.shared.name,
            dropped = queue.len() + timers.len(),
            "event loop disposed"
        );

        // Dropping work may re-enter the loop (e.g. cancel a timer), so it
        // happens after the state lock is released.
        drop(queue);
        drop(timers);
    }

    fn check_owner(&self) -> LoopResult<()> {
        if self.is_owner_thread() {
            Ok(())
        } else {
            Err(LoopError::WrongThread)
        }
    }

    fn invoke(&self, callback: Callback) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
            tracing::error!(
                loop_id = self.shared.id.as_u64(),
                name = %self.shared.name,
                "loop callback panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl LoopHandle for EventLoop {
    fn id(&self) -> LoopId {
        self.shared.id
    }

    fn name(&self) -> &str {
        &self.shared.name
    }

    fn post_async(&self, callback: Callback) -> LoopResult<()> {
        let mut state = self.shared.state.lock();
        if self.is_disposed() {
            drop(state);
            return Err(LoopError::Disposed);
        }
        state.queue.push_back(callback);
        drop(state);

        self.shared.wakeup.notify_one();
        Ok(())
    }

    fn post_timer(&self, delay: Duration, callback: Callback) -> LoopResult<TimerToken> {
        let fire_at = Instant::now() + delay.min(MAX_TIMER_DELAY);

        let mut state = self.shared.state.lock();
        if self.is_disposed() {
            drop(state);
            return Err(LoopError::Disposed);
        }
        let token = state.timers.schedule(fire_at, callback);
        drop(state);

        // The owner may be sleeping until a later deadline
        self.shared.wakeup.notify_one();
        Ok(token)
    }

    fn cancel_timer(&self, token: TimerToken) {
        let removed = self.shared.state.lock().timers.cancel(token);
        drop(removed);
    }

    fn is_disposed(&self) -> bool {
        EventLoop::is_disposed(self)
    }

    fn owner_thread(&self) -> ThreadId {
        self.shared.owner
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
