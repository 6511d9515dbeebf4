//! LoopDispatcher: task segments onto one event loop
//!
//! Every dispatch goes through the loop's async queue, so posts from one
//! thread run in submission order. Work aimed at a disposed loop is dropped
//! quietly; a job whose continuation is dropped resolves as dropped rather
//! than hanging.

use crate::ImmediateLoopDispatcher;
use loopdispatch_runtime::{
    Action, DispatchError, Dispatcher, DisposableHandle, MainDispatcher, Resumer, Runnable,
};
use loopdispatch_toolkit::{Callback, LoopHandle, LoopId};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Decides whether a timer fires or is cancelled; exactly one wins
struct TimerSlot {
    state: AtomicU8,
}

impl TimerSlot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
        }
    }

    fn try_fire(&self) -> bool {
        self.transition(FIRED)
    }

    fn try_cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Dispatcher bound to one event loop
///
/// Several dispatchers may wrap the same loop; they compare equal.
#[derive(Clone)]
pub struct LoopDispatcher {
    handle: Arc<dyn LoopHandle>,
    name: Arc<str>,
}

impl LoopDispatcher {
    /// Dispatcher named after the loop
    pub fn new(handle: Arc<dyn LoopHandle>) -> Self {
        let name = Arc::from(handle.name());
        Self { handle, name }
    }

    /// Dispatcher with an explicit diagnostic name
    pub fn with_name(handle: Arc<dyn LoopHandle>, name: impl Into<Arc<str>>) -> Self {
        Self {
            handle,
            name: name.into(),
        }
    }

    /// The wrapped loop
    pub fn handle(&self) -> &Arc<dyn LoopHandle> {
        &self.handle
    }

    /// Identity of the wrapped loop
    pub fn loop_id(&self) -> LoopId {
        self.handle.id()
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the wrapped loop is disposed
    pub fn is_disposed(&self) -> bool {
        self.handle.is_disposed()
    }

    /// Whether the caller runs on the loop's owner thread
    pub fn is_owner_thread(&self) -> bool {
        self.handle.is_owner_thread()
    }

    /// Always true: every segment is posted, even from the loop thread
    pub fn needs_dispatch(&self, _on_owner_thread: bool) -> bool {
        true
    }

    /// Post `callback` to the loop
    ///
    /// Dropped without error when the loop is already disposed. Fails with
    /// `DispatchError::Rejected` if the loop is disposed while posting.
    pub fn dispatch_callback(&self, callback: Callback) -> Result<(), DispatchError> {
        if self.handle.is_disposed() {
            tracing::trace!(dispatcher = %self, "loop disposed, dropping dispatch");
            return Ok(());
        }
        self.handle.post_async(callback).map_err(|err| {
            tracing::warn!(dispatcher = %self, "post rejected: {}", err);
            DispatchError::Rejected(err.to_string())
        })
    }

    /// Run `callback` on the loop after `delay`; the handle cancels it
    ///
    /// Used to resume suspended waits. Returns an inert handle and never runs
    /// `callback` when the loop is disposed.
    pub fn schedule_delayed(
        &self,
        delay: Duration,
        callback: Callback,
    ) -> Result<DisposableHandle, DispatchError> {
        self.schedule(delay, callback)
    }

    /// Same contract as `schedule_delayed`, for timeout notifications
    pub fn schedule_timeout_callback(
        &self,
        delay: Duration,
        callback: Callback,
    ) -> Result<DisposableHandle, DispatchError> {
        self.schedule(delay, callback)
    }

    fn schedule(
        &self,
        delay: Duration,
        callback: Callback,
    ) -> Result<DisposableHandle, DispatchError> {
        if self.handle.is_disposed() {
            tracing::trace!(dispatcher = %self, ?delay, "loop disposed, dropping timer");
            return Ok(DisposableHandle::noop());
        }

        let slot = Arc::new(TimerSlot::new());
        let fire_slot = slot.clone();
        let token = self
            .handle
            .post_timer(
                delay,
                Box::new(move || {
                    // The loop may have dequeued us just before a cancel.
                    if fire_slot.try_fire() {
                        callback();
                    }
                }),
            )
            .map_err(|err| {
                tracing::warn!(dispatcher = %self, "timer rejected: {}", err);
                DispatchError::Rejected(err.to_string())
            })?;

        let handle = self.handle.clone();
        Ok(DisposableHandle::new(move || {
            if slot.try_cancel() {
                handle.cancel_timer(token);
            }
        }))
    }

    /// Variant that skips the post when already on the loop thread
    pub fn immediate(&self) -> ImmediateLoopDispatcher {
        ImmediateLoopDispatcher::new(self.clone())
    }
}

impl Dispatcher for LoopDispatcher {
    fn dispatch(&self, runnable: Runnable) -> Result<(), DispatchError> {
        self.dispatch_callback(Box::new(move || {
            runnable.run();
        }))
    }

    fn is_dispatch_needed(&self) -> bool {
        self.needs_dispatch(self.is_owner_thread())
    }

    fn schedule_resume_after_delay(
        &self,
        delay: Duration,
        resumer: Resumer,
    ) -> Result<DisposableHandle, DispatchError> {
        // Already on the loop thread when the timer fires.
        self.schedule_delayed(delay, Box::new(move || resumer.resume_undispatched()))
    }

    fn invoke_on_timeout(
        &self,
        delay: Duration,
        action: Action,
    ) -> Result<DisposableHandle, DispatchError> {
        self.schedule_timeout_callback(delay, action)
    }
}

impl MainDispatcher for LoopDispatcher {
    fn immediate(self: Arc<Self>) -> Arc<dyn MainDispatcher> {
        Arc::new(ImmediateLoopDispatcher::new(self.as_ref().clone()))
    }
}

impl PartialEq for LoopDispatcher {
    fn eq(&self, other: &Self) -> bool {
        self.handle.id() == other.handle.id()
    }
}

impl Eq for LoopDispatcher {}

impl fmt::Display for LoopDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventLoop-{}", self.name)
    }
}

impl fmt::Debug for LoopDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopDispatcher")
            .field("loop", &self.handle.id())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_slot_fire_then_cancel() {
        let slot = TimerSlot::new();
        assert!(slot.try_fire());
        assert!(!slot.try_cancel());
        assert!(!slot.try_fire());
    }

    #[test]
    fn test_timer_slot_cancel_then_fire() {
        let slot = TimerSlot::new();
        assert!(slot.try_cancel());
        assert!(!slot.try_fire());
        assert!(!slot.try_cancel());
    }
}
