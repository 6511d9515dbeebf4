//! Immediate variant of the loop dispatcher

use crate::LoopDispatcher;
use loopdispatch_runtime::{
    Action, DispatchError, Dispatcher, DisposableHandle, MainDispatcher, Resumer, Runnable,
};
use loopdispatch_toolkit::LoopHandle;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Loop dispatcher that runs a segment inline when the caller is already on
/// the loop thread
///
/// Inline runs may overtake work already queued on the loop. Posts from other
/// threads behave exactly like `LoopDispatcher`.
#[derive(Clone, PartialEq, Eq)]
pub struct ImmediateLoopDispatcher {
    base: LoopDispatcher,
}

impl ImmediateLoopDispatcher {
    pub(crate) fn new(base: LoopDispatcher) -> Self {
        Self { base }
    }

    /// The queue-always dispatcher for the same loop
    pub fn base(&self) -> &LoopDispatcher {
        &self.base
    }

    /// The wrapped loop
    pub fn handle(&self) -> &Arc<dyn LoopHandle> {
        self.base.handle()
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Whether the wrapped loop is disposed
    pub fn is_disposed(&self) -> bool {
        self.base.is_disposed()
    }

    /// False only when already on the loop's owner thread
    pub fn needs_dispatch(&self, on_owner_thread: bool) -> bool {
        !on_owner_thread
    }

    /// This dispatcher is already immediate
    pub fn immediate(&self) -> &Self {
        self
    }
}

impl Dispatcher for ImmediateLoopDispatcher {
    fn dispatch(&self, runnable: Runnable) -> Result<(), DispatchError> {
        self.base.dispatch(runnable)
    }

    fn is_dispatch_needed(&self) -> bool {
        self.needs_dispatch(self.base.is_owner_thread())
    }

    fn schedule_resume_after_delay(
        &self,
        delay: Duration,
        resumer: Resumer,
    ) -> Result<DisposableHandle, DispatchError> {
        self.base.schedule_resume_after_delay(delay, resumer)
    }

    fn invoke_on_timeout(
        &self,
        delay: Duration,
        action: Action,
    ) -> Result<DisposableHandle, DispatchError> {
        self.base.invoke_on_timeout(delay, action)
    }
}

impl MainDispatcher for ImmediateLoopDispatcher {
    fn immediate(self: Arc<Self>) -> Arc<dyn MainDispatcher> {
        self
    }
}

impl fmt::Display for ImmediateLoopDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [immediate]", self.base)
    }
}

impl fmt::Debug for ImmediateLoopDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImmediateLoopDispatcher")
            .field(&self.base)
            .finish()
    }
}
