//! Dispatcher seam
//!
//! A dispatcher decides where a ready task segment runs. The runtime never
//! runs a segment itself unless the dispatcher says no dispatch is needed.

use crate::{DispatchError, DisposableHandle, Resumer, Runnable};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Zero-argument callback handed to a dispatcher
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling target for task segments
pub trait Dispatcher: Send + Sync + fmt::Display {
    /// Arrange for `runnable` to run later
    ///
    /// Dropping the runnable instead of running it is allowed; the owning job
    /// then resolves with `JobError::Dropped`.
    fn dispatch(&self, runnable: Runnable) -> Result<(), DispatchError>;

    /// Whether a woken segment must go through `dispatch` (`false` = run inline)
    fn is_dispatch_needed(&self) -> bool {
        true
    }

    /// Resume a suspended `delay` after `delay`
    ///
    /// The returned handle is disposed when the waiting job is cancelled.
    fn schedule_resume_after_delay(
        &self,
        delay: Duration,
        resumer: Resumer,
    ) -> Result<DisposableHandle, DispatchError>;

    /// Run `action` after `delay`; the caller disposes the handle when the
    /// guarded work finishes first
    fn invoke_on_timeout(
        &self,
        delay: Duration,
        action: Action,
    ) -> Result<DisposableHandle, DispatchError>;
}

/// Dispatcher for a UI-style main thread, with an "immediate" variant
pub trait MainDispatcher: Dispatcher {
    /// Variant that runs inline when already on the target thread
    ///
    /// Calling this on an immediate dispatcher returns the same instance.
    fn immediate(self: Arc<Self>) -> Arc<dyn MainDispatcher>;
}
