//! LoopHandle trait: the surface a dispatch adapter consumes
//!
//! A loop executes posted callbacks one at a time on its owner thread. Posting
//! never blocks the caller.

use crate::LoopResult;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Zero-argument callback executed on the loop thread
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Identity of one loop instance
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoopId(u64);

static NEXT_LOOP_ID: AtomicU64 = AtomicU64::new(1);

impl LoopId {
    /// Allocate a new unique LoopId
    pub fn new() -> Self {
        LoopId(NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for LoopId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

/// Registration of one pending timer; used to cancel it before it fires
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Token from a raw value, for `LoopHandle` implementations outside this crate
    pub fn from_u64(id: u64) -> Self {
        TimerToken(id)
    }

    /// Get the numeric token value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One cooperative event loop, observed (not owned) by its users
pub trait LoopHandle: Send + Sync {
    /// Identity of the underlying loop
    fn id(&self) -> LoopId;

    /// Diagnostic name
    fn name(&self) -> &str;

    /// Enqueue `callback` for a later loop iteration
    ///
    /// Returns immediately. Fails with `LoopError::Disposed` once the loop is
    /// torn down; the callback is dropped without running.
    fn post_async(&self, callback: Callback) -> LoopResult<()>;

    /// Run `callback` on the loop thread after at least `delay`
    fn post_timer(&self, delay: Duration, callback: Callback) -> LoopResult<TimerToken>;

    /// Cancel a pending timer. Unknown or already fired tokens are ignored.
    fn cancel_timer(&self, token: TimerToken);

    /// Whether the loop is disposed. Never goes back to `false`.
    fn is_disposed(&self) -> bool;

    /// The only thread allowed to run callbacks posted to this loop
    fn owner_thread(&self) -> ThreadId;

    /// Whether the calling thread is the owner thread
    fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner_thread()
    }
}
