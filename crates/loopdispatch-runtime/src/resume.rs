//! Single-use resumption of a suspended `delay`

use crate::DispatchError;
use futures::task::AtomicWaker;
use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Poll, Waker};

const PENDING: u8 = 0;
const RESUMED: u8 = 1;
const ABANDONED: u8 = 2;

thread_local! {
    /// Set while `resume_undispatched` wakes its task
    static UNDISPATCHED: Cell<bool> = const { Cell::new(false) };
}

/// Consume the undispatched-resume flag for this thread
pub(crate) fn take_undispatched() -> bool {
    UNDISPATCHED.with(|flag| flag.replace(false))
}

pub(crate) struct ResumeState {
    state: AtomicU8,
    waker: AtomicWaker,
}

impl ResumeState {
    fn complete(&self, outcome: u8) {
        if self
            .state
            .compare_exchange(PENDING, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.waker.wake();
        }
    }

    pub(crate) fn register(&self, waker: &Waker) {
        self.waker.register(waker);
    }

    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Poll<Result<(), DispatchError>> {
        self.waker.register(waker);
        match self.state.load(Ordering::Acquire) {
            PENDING => Poll::Pending,
            RESUMED => Poll::Ready(Ok(())),
            _ => Poll::Ready(Err(DispatchError::Abandoned)),
        }
    }
}

/// Continuation of a task suspended in `delay`
///
/// Consumed by `resume` or `resume_undispatched`. Dropping it unfired (for
/// instance because its timer was cancelled or its loop was disposed) fails the
/// waiting `delay` with `DispatchError::Abandoned` instead of leaving it hung.
pub struct Resumer {
    state: Option<Arc<ResumeState>>,
}

impl Resumer {
    pub(crate) fn new() -> (Self, Arc<ResumeState>) {
        let state = Arc::new(ResumeState {
            state: AtomicU8::new(PENDING),
            waker: AtomicWaker::new(),
        });
        (
            Self {
                state: Some(state.clone()),
            },
            state,
        )
    }

    /// Wake the task through its dispatcher
    pub fn resume(mut self) {
        if let Some(state) = self.state.take() {
            state.complete(RESUMED);
        }
    }

    /// Wake the task and run it inline on the calling thread
    ///
    /// Only call this from the thread the task's dispatcher runs work on.
    pub fn resume_undispatched(mut self) {
        if let Some(state) = self.state.take() {
            UNDISPATCHED.with(|flag| flag.set(true));
            state.complete(RESUMED);
            UNDISPATCHED.with(|flag| flag.set(false));
        }
    }

    /// Whether the waiting `delay` is still pending
    pub fn is_active(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.state.load(Ordering::Acquire) == PENDING)
    }
}

impl Drop for Resumer {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.complete(ABANDONED);
        }
    }
}

impl std::fmt::Debug for Resumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resumer")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;

    #[test]
    fn test_resume() {
        let (resumer, state) = Resumer::new();
        let waker = noop_waker();

        assert!(resumer.is_active());
        assert!(state.poll_outcome(&waker).is_pending());

        resumer.resume();
        assert_eq!(state.poll_outcome(&waker), Poll::Ready(Ok(())));
    }

    #[test]
    fn test_drop_abandons() {
        let (resumer, state) = Resumer::new();
        drop(resumer);

        assert_eq!(
            state.poll_outcome(&noop_waker()),
            Poll::Ready(Err(DispatchError::Abandoned))
        );
    }

    #[test]
    fn test_undispatched_flag_is_cleared() {
        let (resumer, state) = Resumer::new();
        resumer.resume_undispatched();

        assert!(!take_undispatched());
        assert_eq!(state.poll_outcome(&noop_waker()), Poll::Ready(Ok(())));
    }
}
